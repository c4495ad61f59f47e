//! Durable task registry storage.
//!
//! The whole registry is one JSON document (`tasks.json`); every mutation
//! loads, mutates and rewrites the full document under a single lock, so
//! callers always observe either the old or the new complete document.
//! Writes go through a temp file + rename to stay atomic on crash.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::{Result, SchedulerError};
use super::task::{TaskConfig, TaskRegistry};

/// Registry file name inside the run directory.
const REGISTRY_FILE: &str = "tasks.json";

/// Durable store for the task registry.
///
/// Clone-friendly; all clones share the same lock and cache.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<TaskRegistry>>,
    path: PathBuf,
}

impl Registry {
    /// Create a registry stored under the given run directory.
    pub fn new(run_dir: &Path) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TaskRegistry::default())),
            path: run_dir.join(REGISTRY_FILE),
        }
    }

    /// Path of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Populate the in-memory state from disk.
    ///
    /// A missing file is not an error and yields an empty registry; a
    /// malformed one is [`SchedulerError::CorruptRegistry`] and leaves the
    /// previous in-memory state untouched.
    pub async fn load(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        *inner = self.read_disk().await?;
        debug!(path = %self.path.display(), tasks = inner.tasks.len(), "Registry loaded");
        Ok(())
    }

    /// Get a copy of the stored config for `id`.
    pub async fn get_task(&self, id: &str) -> Option<TaskConfig> {
        let inner = self.inner.lock().await;
        inner.find(id).cloned()
    }

    /// Snapshot of all configs in stored order.
    pub async fn all_tasks(&self) -> Vec<TaskConfig> {
        let inner = self.inner.lock().await;
        inner.tasks.clone()
    }

    /// Append a new task and persist.
    pub async fn add_task(&self, config: TaskConfig) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.find(&config.id).is_some() {
            return Err(SchedulerError::AlreadyExists(config.id));
        }
        inner.tasks.push(config);
        self.persist(&inner).await
    }

    /// Remove a task and persist.
    pub async fn remove_task(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        if inner.tasks.len() == before {
            return Err(SchedulerError::NotFound(id.to_string()));
        }
        self.persist(&inner).await
    }

    /// Replace a stored config wholesale, by id, and persist.
    pub async fn update_task(&self, config: TaskConfig) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.find_mut(&config.id) {
            Some(slot) => *slot = config,
            None => return Err(SchedulerError::NotFound(config.id)),
        }
        self.persist(&inner).await
    }

    /// Apply an in-place mutation to the current on-disk state of `id`.
    ///
    /// Reloads the document from disk before mutating, so concurrent
    /// writers (e.g. the `add` subcommand patching `next_run` while the
    /// daemon owns the registry) never clobber fields they did not touch.
    pub async fn patch_task<F>(&self, id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut TaskConfig),
    {
        let mut inner = self.inner.lock().await;
        let mut fresh = self.read_disk().await?;
        match fresh.find_mut(id) {
            Some(config) => mutate(config),
            None => return Err(SchedulerError::NotFound(id.to_string())),
        }
        self.persist(&fresh).await?;
        *inner = fresh;
        Ok(())
    }

    async fn read_disk(&self) -> Result<TaskRegistry> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TaskRegistry::default());
            }
            Err(e) => {
                return Err(SchedulerError::Storage(format!(
                    "read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        serde_json::from_slice(&data).map_err(|e| {
            SchedulerError::CorruptRegistry(format!("parse {}: {}", self.path.display(), e))
        })
    }

    /// Write the full document atomically via temp file + rename.
    async fn persist(&self, registry: &TaskRegistry) -> Result<()> {
        let content = serde_json::to_vec_pretty(registry)
            .map_err(|e| SchedulerError::Storage(format!("serialize registry: {}", e)))?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| SchedulerError::Storage(format!("create {}: {}", dir.display(), e)))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await.map_err(|e| {
            SchedulerError::Storage(format!("write {}: {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            SchedulerError::Storage(format!("rename {}: {}", temp_path.display(), e))
        })?;

        Ok(())
    }
}
