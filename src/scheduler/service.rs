//! The polling scheduler service.
//!
//! A single background loop ticks once a minute and runs a two-stage
//! dispatch over every registered task: a cheap `next_run` comparison
//! first, then the task's own `should_run` predicate. State is persisted
//! after every decision so a crash right after an execution cannot lose
//! the updated schedule.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::Result;
use super::registry::Registry;
use super::task::{Decision, Task, TaskConfig, TaskId, TaskType};
use super::timing;

/// Fixed dispatch tick. Coarser precision is a non-goal.
const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How often the loop looks for the external reset signal between ticks.
const RESET_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Marker file whose presence asks the daemon to reload the registry.
const RESET_SIGNAL_FILE: &str = ".reset";

/// Command to the scheduler service.
enum SchedulerCommand {
    /// Reload the registry and dispatch immediately.
    Poke,
    /// Shut the loop down.
    Shutdown,
}

/// Handle for interacting with a running scheduler.
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the scheduler to reload the registry and dispatch now instead
    /// of waiting for the next natural tick.
    pub async fn poke(&self) {
        let _ = self.command_tx.send(SchedulerCommand::Poke).await;
    }

    /// Stop the loop cooperatively and wait for it to exit. An in-flight
    /// execution is not interrupted.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;
        let _ = self.join.await;
    }
}

/// Seed parameters for bootstrapping the task registry from app config.
pub struct TaskBootstrap {
    /// Reminder cadence in minutes.
    pub reminder_interval_minutes: u32,
    /// Daily summary anchor ("HH:MM").
    pub summary_time: String,
    /// Weekly summary seed, if the feature is enabled.
    pub weekly_summary: Option<WeeklyBootstrap>,
}

/// Weekly summary seed.
pub struct WeeklyBootstrap {
    /// Target weekday, 1=Monday .. 7=Sunday.
    pub weekday: u8,
    /// Anchor time ("HH:MM").
    pub time: String,
}

/// The scheduler service.
///
/// Owns the registry and the registered [`Task`] instances. Tasks are
/// considered sequentially within a tick; only re-entrancy of the same
/// task id needs the explicit guard, for the case where an execution
/// outlives a tick.
pub struct SchedulerService {
    registry: Registry,
    tasks: HashMap<TaskId, Arc<dyn Task>>,
    running: Arc<Mutex<HashSet<TaskId>>>,
    reset_signal: PathBuf,
}

impl SchedulerService {
    /// Create a service over a registry, with the reset signal file kept
    /// under `run_dir`.
    pub fn new(registry: Registry, run_dir: &std::path::Path) -> Self {
        Self {
            registry,
            tasks: HashMap::new(),
            running: Arc::new(Mutex::new(HashSet::new())),
            reset_signal: run_dir.join(RESET_SIGNAL_FILE),
        }
    }

    /// Register a task instance under its id.
    pub fn register_task(&mut self, task: Arc<dyn Task>) {
        info!(task_id = %task.id(), name = %task.name(), "Task registered");
        self.tasks.insert(task.id().to_string(), task);
    }

    /// Shared registry handle.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Seed the registry from configuration.
    ///
    /// Existing entries are patched in place so only static fields are
    /// re-synced; runtime fields (`next_run`, `last_run`, `last_success`,
    /// `last_error`, `data`) survive a restart and in-flight schedules
    /// are not reset.
    pub async fn init_tasks(&self, boot: &TaskBootstrap) -> Result<()> {
        let now = Local::now();

        let mut reminder = TaskConfig::interval(
            "work-reminder",
            "Work journal reminder",
            boot.reminder_interval_minutes,
        );
        reminder.next_run = Some(timing::next_interval_run(
            now,
            boot.reminder_interval_minutes,
        ));
        self.upsert_task(reminder).await?;

        let mut summary = TaskConfig::daily("daily-summary", "Daily summary", &boot.summary_time);
        summary.next_run = Some(timing::next_daily_run(now, &boot.summary_time));
        self.upsert_task(summary).await?;

        // Log rotation runs on a fixed 3-hour cadence, unaligned.
        let mut log_rotate = TaskConfig::interval("log-rotate", "Log rotation", 180);
        log_rotate.next_run = Some(now + chrono::Duration::hours(3));
        self.upsert_task(log_rotate).await?;

        if let Some(weekly) = &boot.weekly_summary {
            let mut config = TaskConfig::daily("weekly-summary", "Weekly summary", &weekly.time);
            config.next_run = Some(timing::next_weekly_run(
                now,
                timing::weekday_from_number(weekly.weekday),
                &weekly.time,
            ));
            self.upsert_task(config).await?;
        }

        info!("Tasks initialized from config");
        Ok(())
    }

    /// Add a task config, or re-sync its static fields if already stored.
    async fn upsert_task(&self, seed: TaskConfig) -> Result<()> {
        if self.registry.get_task(&seed.id).await.is_some() {
            return self
                .registry
                .patch_task(&seed.id.clone(), move |current| {
                    current.name = seed.name;
                    current.kind = seed.kind;
                    current.enabled = seed.enabled;
                    current.interval_minutes = seed.interval_minutes;
                    current.time = seed.time;
                    // next_run, last_run, last_success, last_error and
                    // data are runtime state and stay as persisted.
                })
                .await;
        }
        info!(
            task_id = %seed.id,
            next_run = ?seed.next_run,
            "Initialized task"
        );
        self.registry.add_task(seed).await
    }

    /// Start the polling loop.
    ///
    /// Loads the registry (refusing to start over a corrupt document),
    /// logs the current task states and spawns the loop. Returns a handle
    /// used to poke or stop it.
    pub async fn start(self) -> Result<SchedulerHandle> {
        self.registry.load().await?;

        let configs = self.registry.all_tasks().await;
        info!(tasks = configs.len(), "Scheduler starting");
        for config in &configs {
            match (config.enabled, config.next_run) {
                (true, Some(next)) => {
                    info!(task_id = %config.id, next_run = %next, "enabled")
                }
                (true, None) => info!(task_id = %config.id, "enabled, not yet scheduled"),
                (false, _) => info!(task_id = %config.id, "disabled"),
            }
        }

        let (command_tx, command_rx) = mpsc::channel(8);
        let join = tokio::spawn(self.run(command_rx));
        Ok(SchedulerHandle { command_tx, join })
    }

    /// Main loop: suspend on the tick timer, the reset poll and the
    /// command channel; exit on shutdown.
    async fn run(self, mut command_rx: mpsc::Receiver<SchedulerCommand>) {
        let mut ticker = tokio::time::interval(CHECK_INTERVAL);
        let mut reset_poll = tokio::time::interval(RESET_POLL_INTERVAL);
        // Swallow the immediate first fire of both timers.
        ticker.tick().await;
        reset_poll.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Wall clock read here, not the tick's target time:
                    // after system sleep the two can differ by hours and
                    // the delay/skip policy needs the real gap.
                    let now = Local::now();
                    self.dispatch_due(now).await;
                }
                _ = reset_poll.tick() => {
                    if self.take_reset_signal().await {
                        info!("Reset signal observed, reloading registry");
                        self.reload_and_dispatch().await;
                    }
                }
                cmd = command_rx.recv() => match cmd {
                    Some(SchedulerCommand::Poke) => {
                        self.reload_and_dispatch().await;
                    }
                    Some(SchedulerCommand::Shutdown) | None => break,
                },
            }
        }

        info!("Scheduler stopped");
    }

    async fn reload_and_dispatch(&self) {
        if let Err(e) = self.registry.load().await {
            error!(error = %e, "Failed to reload registry");
            return;
        }
        self.dispatch_due(Local::now()).await;
    }

    /// One dispatch pass: evaluate every registered config against `now`.
    pub async fn dispatch_due(&self, now: DateTime<Local>) {
        for config in self.registry.all_tasks().await {
            if !config.enabled {
                debug!(task_id = %config.id, "skip: disabled");
                continue;
            }

            // Coarse filter: cheap timestamp check, no task logic.
            let Some(next_run) = config.next_run else {
                debug!(task_id = %config.id, "skip: not scheduled");
                continue;
            };
            if now < next_run {
                continue;
            }

            let Some(task) = self.tasks.get(&config.id) else {
                warn!(task_id = %config.id, "task in registry but not registered");
                continue;
            };

            // Fine filter: the task's own business rules.
            match task.should_run(now, &config).await {
                Decision::Skip => {
                    debug!(task_id = %config.id, "skip: should_run declined");
                }
                Decision::Reschedule(next) => {
                    info!(task_id = %config.id, next_run = %next, "Rescheduled without running");
                    if let Err(e) = self
                        .registry
                        .patch_task(&config.id, |c| c.next_run = Some(next))
                        .await
                    {
                        error!(task_id = %config.id, error = %e, "Failed to reschedule");
                    }
                }
                Decision::Run => {
                    self.run_task(Arc::clone(task), config, now).await;
                }
            }
        }
    }

    /// Execute one task under the re-entrancy guard and persist the
    /// resulting config.
    async fn run_task(&self, task: Arc<dyn Task>, mut config: TaskConfig, now: DateTime<Local>) {
        {
            let mut running = self.running.lock().await;
            if !running.insert(config.id.clone()) {
                warn!(task_id = %config.id, "Still running from a previous cycle, skipping");
                return;
            }
        }

        info!(task_id = %config.id, name = %config.name, "Executing task");
        let result = task.execute().await;

        {
            let mut running = self.running.lock().await;
            running.remove(&config.id);
        }

        match &result {
            Ok(()) => info!(task_id = %config.id, "Task completed"),
            Err(e) => error!(task_id = %config.id, error = %e, "Task failed"),
        }

        task.on_executed(now, &mut config, result.as_ref().err());

        if config.kind == TaskType::Once {
            config.enabled = false;
        }

        // A save failure after a successful execution is logged, not
        // rolled back: "executed but not durably recorded" is accepted.
        if let Err(e) = self.registry.update_task(config).await {
            error!(error = %e, "Failed to persist task state after execution");
        }
    }

    /// Check for the reset marker file; clear it when present.
    pub async fn take_reset_signal(&self) -> bool {
        match tokio::fs::remove_file(&self.reset_signal).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %self.reset_signal.display(), error = %e, "Failed to clear reset signal");
                false
            }
        }
    }
}

/// Touch the reset signal file under `run_dir`.
///
/// Used by the `add`/`popup` subcommands after patching a schedule from
/// outside the daemon process.
pub async fn write_reset_signal(run_dir: &std::path::Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(run_dir).await?;
    tokio::fs::write(run_dir.join(RESET_SIGNAL_FILE), b"").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counting task: always runs, reschedules one interval ahead.
    struct CountingTask {
        id: String,
        executions: AtomicUsize,
        delay: Duration,
    }

    impl CountingTask {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                executions: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(id: &str, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new(id)
            }
        }
    }

    #[async_trait::async_trait]
    impl Task for CountingTask {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            "counting task"
        }

        async fn should_run(&self, _now: DateTime<Local>, _config: &TaskConfig) -> Decision {
            Decision::Run
        }

        async fn execute(&self) -> anyhow::Result<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(())
        }

        fn on_executed(
            &self,
            now: DateTime<Local>,
            config: &mut TaskConfig,
            error: Option<&anyhow::Error>,
        ) {
            config.record_outcome(now, error);
            let interval = config.interval_minutes.unwrap_or(60);
            config.next_run = Some(timing::next_interval_run(now, interval));
        }
    }

    /// Task that always declines and asks for a reschedule.
    struct DecliningTask {
        next: DateTime<Local>,
    }

    #[async_trait::async_trait]
    impl Task for DecliningTask {
        fn id(&self) -> &str {
            "decliner"
        }

        fn name(&self) -> &str {
            "declining task"
        }

        async fn should_run(&self, _now: DateTime<Local>, _config: &TaskConfig) -> Decision {
            Decision::Reschedule(self.next)
        }

        async fn execute(&self) -> anyhow::Result<()> {
            panic!("must not execute");
        }

        fn on_executed(&self, _: DateTime<Local>, _: &mut TaskConfig, _: Option<&anyhow::Error>) {}
    }

    async fn seeded_service(
        temp_dir: &TempDir,
        config: TaskConfig,
        task: Arc<dyn Task>,
    ) -> SchedulerService {
        let registry = Registry::new(temp_dir.path());
        registry.add_task(config).await.unwrap();
        let mut service = SchedulerService::new(registry, temp_dir.path());
        service.register_task(task);
        service
    }

    #[tokio::test]
    async fn due_interval_task_runs_once_and_advances() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = TaskConfig::interval("counter", "Counter", 45);
        let now = Local::now();
        config.next_run = Some(now - chrono::Duration::minutes(2));

        let task = Arc::new(CountingTask::new("counter"));
        let service = seeded_service(&temp_dir, config, task.clone()).await;

        service.dispatch_due(now).await;

        assert_eq!(task.executions.load(Ordering::SeqCst), 1);
        let stored = service.registry().get_task("counter").await.unwrap();
        assert_eq!(stored.last_run, Some(now));
        assert_eq!(stored.last_success, Some(now));
        let next = stored.next_run.unwrap();
        assert_eq!(next, timing::next_interval_run(now, 45));
        assert!(next > now);
    }

    #[tokio::test]
    async fn future_task_is_not_dispatched() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = TaskConfig::interval("counter", "Counter", 45);
        let now = Local::now();
        config.next_run = Some(now + chrono::Duration::minutes(10));

        let task = Arc::new(CountingTask::new("counter"));
        let service = seeded_service(&temp_dir, config, task.clone()).await;

        service.dispatch_due(now).await;
        assert_eq!(task.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_and_unscheduled_tasks_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let now = Local::now();

        let mut disabled = TaskConfig::interval("disabled", "Disabled", 45);
        disabled.enabled = false;
        disabled.next_run = Some(now - chrono::Duration::minutes(2));
        let unscheduled = TaskConfig::interval("unscheduled", "Unscheduled", 45);

        let registry = Registry::new(temp_dir.path());
        registry.add_task(disabled).await.unwrap();
        registry.add_task(unscheduled).await.unwrap();

        let mut service = SchedulerService::new(registry, temp_dir.path());
        let a = Arc::new(CountingTask::new("disabled"));
        let b = Arc::new(CountingTask::new("unscheduled"));
        service.register_task(a.clone());
        service.register_task(b.clone());

        service.dispatch_due(now).await;
        assert_eq!(a.executions.load(Ordering::SeqCst), 0);
        assert_eq!(b.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reschedule_decision_patches_without_running() {
        let temp_dir = TempDir::new().unwrap();
        let now = Local::now();
        let pushed = now + chrono::Duration::minutes(30);

        let mut config = TaskConfig::interval("decliner", "Decliner", 60);
        config.next_run = Some(now - chrono::Duration::minutes(5));

        let service =
            seeded_service(&temp_dir, config, Arc::new(DecliningTask { next: pushed })).await;
        service.dispatch_due(now).await;

        let stored = service.registry().get_task("decliner").await.unwrap();
        assert_eq!(stored.next_run, Some(pushed));
        assert!(stored.last_run.is_none());
    }

    #[tokio::test]
    async fn overlapping_cycles_execute_once() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = TaskConfig::interval("slow", "Slow", 45);
        let now = Local::now();
        config.next_run = Some(now - chrono::Duration::minutes(1));

        let task = Arc::new(CountingTask::slow("slow", Duration::from_millis(200)));
        let service = seeded_service(&temp_dir, config, task.clone()).await;

        // Two dispatch cycles overlapping in time: the second reaches the
        // task while the first is still executing and must skip it.
        tokio::join!(service.dispatch_due(now), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            service.dispatch_due(now).await;
        });

        assert_eq!(task.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_task_records_error_and_loop_survives() {
        struct FailingTask;

        #[async_trait::async_trait]
        impl Task for FailingTask {
            fn id(&self) -> &str {
                "failing"
            }
            fn name(&self) -> &str {
                "failing task"
            }
            async fn should_run(&self, _: DateTime<Local>, _: &TaskConfig) -> Decision {
                Decision::Run
            }
            async fn execute(&self) -> anyhow::Result<()> {
                anyhow::bail!("boom")
            }
            fn on_executed(
                &self,
                now: DateTime<Local>,
                config: &mut TaskConfig,
                error: Option<&anyhow::Error>,
            ) {
                config.record_outcome(now, error);
                config.next_run = Some(timing::next_interval_run(now, 60));
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let now = Local::now();
        let mut failing = TaskConfig::interval("failing", "Failing", 60);
        failing.next_run = Some(now - chrono::Duration::minutes(1));
        let mut counter = TaskConfig::interval("counter", "Counter", 60);
        counter.next_run = Some(now - chrono::Duration::minutes(1));

        let registry = Registry::new(temp_dir.path());
        registry.add_task(failing).await.unwrap();
        registry.add_task(counter).await.unwrap();

        let mut service = SchedulerService::new(registry, temp_dir.path());
        service.register_task(Arc::new(FailingTask));
        let task = Arc::new(CountingTask::new("counter"));
        service.register_task(task.clone());

        service.dispatch_due(now).await;

        // The failure is recorded and the later task still ran.
        let stored = service.registry().get_task("failing").await.unwrap();
        assert_eq!(stored.last_error.as_deref(), Some("boom"));
        assert!(stored.last_success.is_none());
        assert_eq!(task.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_signal_is_consumed() {
        let temp_dir = TempDir::new().unwrap();
        let registry = Registry::new(temp_dir.path());
        let service = SchedulerService::new(registry, temp_dir.path());

        assert!(!service.take_reset_signal().await);

        write_reset_signal(temp_dir.path()).await.unwrap();
        assert!(service.take_reset_signal().await);
        assert!(!service.take_reset_signal().await);
    }

    #[tokio::test]
    async fn init_tasks_preserves_runtime_state_across_restart() {
        let temp_dir = TempDir::new().unwrap();
        let registry = Registry::new(temp_dir.path());
        let service = SchedulerService::new(registry.clone(), temp_dir.path());

        let boot = TaskBootstrap {
            reminder_interval_minutes: 45,
            summary_time: "00:00".to_string(),
            weekly_summary: Some(WeeklyBootstrap {
                weekday: 1,
                time: "09:00".to_string(),
            }),
        };
        service.init_tasks(&boot).await.unwrap();

        let ids: Vec<_> = registry.all_tasks().await.into_iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            ["work-reminder", "daily-summary", "log-rotate", "weekly-summary"]
        );

        // Simulate runtime progress, then a restart with a changed interval.
        let ran_at = Local::now();
        registry
            .patch_task("work-reminder", |c| {
                c.last_run = Some(ran_at);
                c.last_error = Some("dialog timeout".to_string());
            })
            .await
            .unwrap();

        let boot2 = TaskBootstrap {
            reminder_interval_minutes: 30,
            ..boot
        };
        let service2 = SchedulerService::new(registry.clone(), temp_dir.path());
        service2.init_tasks(&boot2).await.unwrap();

        let reminder = registry.get_task("work-reminder").await.unwrap();
        assert_eq!(reminder.interval_minutes, Some(30));
        assert_eq!(reminder.last_run, Some(ran_at));
        assert_eq!(reminder.last_error.as_deref(), Some("dialog timeout"));
    }
}
