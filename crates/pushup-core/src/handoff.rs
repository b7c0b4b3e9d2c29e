//! File-based handoff with the web application
//!
//! The web side drops a one-line command file; the daemon consumes and
//! deletes it. A marker file signals that the device is occupied. Neither
//! file is locked: the marker is advisory only.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::Command;

/// Content the daemon writes into the busy lock
pub const LOCK_CONTENT: &str = "locked";

/// Handoff file errors
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The command was read but the file could not be deleted
    #[error("Failed to remove {path} (content: '{content}'): {source}")]
    Remove {
        path: PathBuf,
        content: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type HandoffResult<T> = Result<T, HandoffError>;

/// The command file written by the web application
#[derive(Debug, Clone)]
pub struct CommandInbox {
    path: PathBuf,
}

impl CommandInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a command is waiting
    pub fn is_pending(&self) -> bool {
        self.path.exists()
    }

    /// Read and delete the command file. Returns the trimmed content, or
    /// `None` when no file exists. Invalid UTF-8 is replaced lossily so the
    /// file is always consumed. Not atomic: a crash between the read and
    /// the delete leaves the command in place.
    pub fn take(&self) -> HandoffResult<Option<String>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(HandoffError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let content = String::from_utf8_lossy(&bytes).trim().to_string();

        if let Err(source) = fs::remove_file(&self.path)
            && source.kind() != ErrorKind::NotFound
        {
            return Err(HandoffError::Remove {
                path: self.path.clone(),
                content,
                source,
            });
        }

        debug!(path = %self.path.display(), content = %content, "Command file consumed");
        Ok(Some(content))
    }

    /// Write a command for the daemon to pick up
    pub fn put(&self, command: &Command) -> HandoffResult<()> {
        fs::write(&self.path, command.to_string()).map_err(|source| HandoffError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Result of inspecting the busy lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// No lock present
    Ready,
    /// Lock present and fresh
    Busy { age: Duration },
    /// Lock was older than the limit and has been removed
    StaleRemoved { age: Duration },
}

impl LockStatus {
    /// `READY` or `BUSY`, as reported to the web application
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Busy { .. } => "BUSY",
            Self::Ready | Self::StaleRemoved { .. } => "READY",
        }
    }
}

/// Advisory marker present while a session is in progress
#[derive(Debug, Clone)]
pub struct BusyLock {
    path: PathBuf,
}

impl BusyLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.path.exists()
    }

    /// Create (or overwrite) the marker with the given content
    pub fn acquire(&self, content: &str) -> HandoffResult<()> {
        fs::write(&self.path, content).map_err(|source| HandoffError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Remove the marker. Returns whether a file was removed.
    pub fn release(&self) -> HandoffResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(HandoffError::Remove {
                path: self.path.clone(),
                content: String::new(),
                source,
            }),
        }
    }

    /// Time since the marker was last written, if it exists
    pub fn age(&self) -> HandoffResult<Option<Duration>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(HandoffError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let modified = metadata.modified().map_err(|source| HandoffError::Read {
            path: self.path.clone(),
            source,
        })?;

        Ok(Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        ))
    }

    /// Report READY/BUSY, removing the marker if it is older than `stale_after`
    pub fn status(&self, stale_after: Duration) -> HandoffResult<LockStatus> {
        let Some(age) = self.age()? else {
            return Ok(LockStatus::Ready);
        };

        if age > stale_after {
            self.release()?;
            info!(
                path = %self.path.display(),
                age_secs = age.as_secs(),
                "Removed stale busy lock"
            );
            return Ok(LockStatus::StaleRemoved { age });
        }

        Ok(LockStatus::Busy { age })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushup_util::RuleId;

    #[test]
    fn take_reads_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = CommandInbox::new(dir.path().join("pushup_cmd.txt"));

        assert_eq!(inbox.take().unwrap(), None);

        fs::write(inbox.path(), "7|Alice\n").unwrap();
        assert!(inbox.is_pending());
        assert_eq!(inbox.take().unwrap().as_deref(), Some("7|Alice"));
        assert!(!inbox.is_pending());
        assert_eq!(inbox.take().unwrap(), None);
    }

    #[test]
    fn take_consumes_non_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = CommandInbox::new(dir.path().join("pushup_cmd.txt"));

        // "7|Алиса" in cp1251
        fs::write(inbox.path(), b"7|\xc0\xeb\xe8\xf1\xe0").unwrap();
        let content = inbox.take().unwrap().unwrap();

        assert!(content.starts_with("7|"));
        assert!(content.contains('\u{FFFD}'));
        assert!(!inbox.is_pending());
    }

    #[test]
    fn put_writes_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = CommandInbox::new(dir.path().join("pushup_cmd.txt"));

        inbox.put(&Command::new(RuleId::new(7), "Alice")).unwrap();
        assert_eq!(fs::read_to_string(inbox.path()).unwrap(), "7|Alice");
    }

    #[test]
    fn unreadable_command_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file
        let inbox = CommandInbox::new(dir.path());
        assert!(matches!(inbox.take(), Err(HandoffError::Read { .. })));
    }

    #[test]
    fn lock_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = BusyLock::new(dir.path().join("pushup_busy.lock"));

        assert!(!lock.is_held());
        assert!(!lock.release().unwrap());

        lock.acquire(LOCK_CONTENT).unwrap();
        assert!(lock.is_held());
        assert_eq!(fs::read_to_string(lock.path()).unwrap(), "locked");

        assert!(lock.release().unwrap());
        assert!(!lock.is_held());
    }

    #[test]
    fn status_ready_and_busy() {
        let dir = tempfile::tempdir().unwrap();
        let lock = BusyLock::new(dir.path().join("pushup_busy.lock"));
        let limit = Duration::from_secs(300);

        assert_eq!(lock.status(limit).unwrap(), LockStatus::Ready);

        lock.acquire(LOCK_CONTENT).unwrap();
        let status = lock.status(limit).unwrap();
        assert!(matches!(status, LockStatus::Busy { .. }));
        assert_eq!(status.as_str(), "BUSY");
        assert!(lock.is_held());
    }

    #[test]
    fn status_removes_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = BusyLock::new(dir.path().join("pushup_busy.lock"));
        lock.acquire(LOCK_CONTENT).unwrap();

        let old = SystemTime::now() - Duration::from_secs(600);
        fs::File::options()
            .write(true)
            .open(lock.path())
            .unwrap()
            .set_modified(old)
            .unwrap();

        let status = lock.status(Duration::from_secs(300)).unwrap();
        assert!(matches!(status, LockStatus::StaleRemoved { .. }));
        assert_eq!(status.as_str(), "READY");
        assert!(!lock.is_held());
    }
}
