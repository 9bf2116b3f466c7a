//! PID file management for the daemon

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// PID file guarding against a second daemon on the same host
pub struct PidFile {
    path: PathBuf,
    owned: bool,
}

impl PidFile {
    /// Create a PID file manager for `path`
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
        }
    }

    /// Get the PID file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PID of a live daemon recorded in the file, if any.
    ///
    /// A file naming a dead process is stale and gets removed.
    pub fn is_running(&self) -> Option<u32> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let pid: u32 = contents.trim().parse().ok()?;
        let raw = i32::try_from(pid).ok()?;

        match kill(Pid::from_raw(raw), None) {
            Ok(()) | Err(Errno::EPERM) => Some(pid),
            Err(Errno::ESRCH) => {
                let _ = fs::remove_file(&self.path);
                None
            }
            Err(_) => None,
        }
    }

    /// Acquire the PID file (fails if another daemon is running)
    pub fn acquire(&mut self) -> Result<(), PidFileError> {
        if let Some(pid) = self.is_running() {
            return Err(PidFileError::AlreadyRunning(pid));
        }

        let mut file = File::create(&self.path)
            .map_err(|e| PidFileError::WriteFailed(format!("Failed to create PID file: {}", e)))?;
        write!(file, "{}", process::id())
            .map_err(|e| PidFileError::WriteFailed(format!("Failed to write PID: {}", e)))?;

        self.owned = true;
        Ok(())
    }

    /// Release the PID file if this process wrote it
    pub fn release(&mut self) -> Result<(), PidFileError> {
        if !self.owned {
            return Ok(());
        }
        self.owned = false;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PidFileError::RemoveFailed(format!(
                "Failed to remove PID file: {}",
                e
            ))),
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// PID file errors
#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("Another daemon is already running (PID: {0})")]
    AlreadyRunning(u32),

    #[error("Failed to write PID file: {0}")]
    WriteFailed(String),

    #[error("Failed to remove PID file: {0}")]
    RemoveFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn is_running_returns_none_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let pid_file = PidFile::with_path(dir.path().join("missing.pid"));
        assert!(pid_file.is_running().is_none());
    }

    #[test]
    fn acquire_writes_own_pid_and_release_removes_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        let mut pid_file = PidFile::with_path(&path);

        pid_file.acquire().unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, process::id().to_string());
        assert_eq!(pid_file.is_running(), Some(process::id()));

        pid_file.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_sees_live_owner() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        let mut first = PidFile::with_path(&path);
        first.acquire().unwrap();

        let mut second = PidFile::with_path(&path);
        assert!(matches!(
            second.acquire(),
            Err(PidFileError::AlreadyRunning(pid)) if pid == process::id()
        ));

        // The loser must not delete the winner's file
        drop(second);
        assert!(path.exists());
    }

    #[test]
    fn garbage_contents_are_not_a_running_daemon() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        fs::write(&path, "not a pid").unwrap();

        let mut pid_file = PidFile::with_path(&path);
        assert!(pid_file.is_running().is_none());
        pid_file.acquire().unwrap();
    }
}
