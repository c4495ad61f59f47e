//! Single-instance process lock.
//!
//! A PID file under the run directory keeps two daemons from polling the
//! same registry. A lock left behind by a dead process is detected with
//! signal 0 and cleaned up automatically.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

/// Lock file name inside the run directory.
const LOCK_FILE: &str = "daylog.lock";

/// Errors acquiring the process lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another live daemon owns the lock.
    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),

    /// I/O error reading or writing the lock file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Held process lock. Releases the PID file on drop.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
}

impl ProcessLock {
    /// Acquire the lock under `run_dir`.
    ///
    /// Fails with [`LockError::AlreadyRunning`] when the recorded PID
    /// belongs to a live process; a stale file is replaced.
    pub fn acquire(run_dir: &Path) -> Result<Self, LockError> {
        fs::create_dir_all(run_dir)?;
        let path = run_dir.join(LOCK_FILE);

        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(pid) = content.trim().parse::<u32>() {
                if process_alive(pid) {
                    return Err(LockError::AlreadyRunning(pid));
                }
                warn!(pid, "Removing stale lock file");
            }
            fs::remove_file(&path)?;
        }

        let pid = std::process::id();
        fs::write(&path, pid.to_string())?;
        info!(pid, path = %path.display(), "Process lock acquired");
        Ok(Self { path })
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to release lock");
            }
        }
    }
}

/// Signal 0 probes for existence without delivering anything.
fn process_alive(pid: u32) -> bool {
    // SAFETY: kill with signal 0 only performs the permission and
    // existence checks.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}
