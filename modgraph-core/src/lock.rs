//! Cross-process exclusive lock around the shared library file.
//!
//! The lock is a file created with `create_new`, holding the owner's pid. It
//! is held for the duration of a whole import or export and released when the
//! guard drops, on success and error paths alike. A lock file older than
//! [`STALE_AFTER`] is assumed to belong to a crashed process and is broken.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

pub const STALE_AFTER: Duration = Duration::from_secs(30);
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct LibraryLock {
    path: PathBuf,
    timeout: Duration,
}

impl LibraryLock {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// `<data dir>/modgraph/library.lock`, if the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("modgraph").join("library.lock"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock, retrying until the timeout elapses.
    ///
    /// Fails with `ErrorKind::TimedOut` if another holder keeps it.
    pub fn acquire(&self) -> io::Result<LibraryLockGuard> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.try_acquire()? {
                Some(guard) => return Ok(guard),
                None if Instant::now() >= deadline => {
                    log::warn!(target: "lock", "timed out waiting for {}", self.path.display());
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("library is locked: {}", self.path.display()),
                    ));
                }
                None => thread::sleep(RETRY_INTERVAL),
            }
        }
    }

    /// One attempt. `Ok(None)` if someone else holds the lock.
    pub fn try_acquire(&self) -> io::Result<Option<LibraryLockGuard>> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                log::debug!(target: "lock", "acquired {}", self.path.display());
                Ok(Some(LibraryLockGuard {
                    path: self.path.clone(),
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if self.is_stale() {
                    log::warn!(target: "lock", "breaking stale lock {}", self.path.display());
                    match fs::remove_file(&self.path) {
                        Ok(()) => return self.try_acquire(),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {
                            return self.try_acquire()
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Block until nobody holds the lock, without keeping it.
    pub fn wait_unlocked(&self) -> io::Result<()> {
        drop(self.acquire()?);
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.path.exists() && !self.is_stale()
    }

    fn is_stale(&self) -> bool {
        let age = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| SystemTime::now().duration_since(t).ok());
        matches!(age, Some(age) if age > STALE_AFTER)
    }
}

/// Proof that the library lock is held. Releases it on drop.
#[derive(Debug)]
pub struct LibraryLockGuard {
    path: PathBuf,
}

impl LibraryLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LibraryLockGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!(target: "lock", "released {}", self.path.display()),
            Err(e) => log::warn!(target: "lock", "could not release {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_in(dir: &tempfile::TempDir, timeout_ms: u64) -> LibraryLock {
        LibraryLock::new(
            dir.path().join("nested").join("library.lock"),
            Duration::from_millis(timeout_ms),
        )
    }

    #[test]
    fn second_holder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, 30);
        let guard = lock.acquire().unwrap();
        assert!(lock.is_locked());

        let err = lock.acquire().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(lock.try_acquire().unwrap().is_none());

        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.try_acquire().unwrap().is_some());
    }

    #[test]
    fn released_on_error_path() {
        fn failing(lock: &LibraryLock) -> io::Result<()> {
            let _guard = lock.acquire()?;
            Err(io::Error::new(io::ErrorKind::Other, "export failed"))
        }
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, 30);
        assert!(failing(&lock).is_err());
        assert!(!lock.path().exists());
    }

    #[test]
    fn wait_unlocked_does_not_keep_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, 30);
        lock.wait_unlocked().unwrap();
        assert!(!lock.is_locked());
    }

    #[test]
    fn waiter_gets_lock_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, 2_000);
        let guard = lock.acquire().unwrap();
        let waiter = {
            let lock = lock.clone();
            thread::spawn(move || lock.acquire().map(|_| ()))
        };
        thread::sleep(Duration::from_millis(50));
        drop(guard);
        assert!(waiter.join().unwrap().is_ok());
    }
}
