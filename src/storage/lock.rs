//! Scoped advisory file locking.
//!
//! A [`FileLock`] is an OS-level advisory exclusive lock on a companion lock
//! file. It is the single mutual-exclusion primitive in this crate: any two
//! operations (within or across processes) that agree on a lock path are
//! totally ordered in real time, and neither ever observes the other's
//! partial work.
//!
//! Acquisition blocks indefinitely; there is no timeout in the base
//! contract. Release happens unconditionally when the guard drops, on every
//! exit path including errors and panics. The lock file itself never holds
//! data and is left in place after release (removing it would race with a
//! waiter that already holds an open handle to it).

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;

/// Exclusive advisory lock guard tied to a lock-file path.
///
/// Held for the duration of a guarded operation; dropping it releases the
/// lock.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive, blocking lock on `lock_path`.
    ///
    /// The lock file (and any missing parent directories) are created as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the lock file cannot be created or the lock
    /// cannot be acquired (e.g. filesystem unavailable). Contention is not
    /// an error; it blocks.
    pub fn acquire(lock_path: &Path) -> io::Result<Self> {
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(lock_path)?;
        fs2::FileExt::lock_exclusive(&file)?;
        trace!(path = %lock_path.display(), "lock acquired");

        Ok(Self {
            file,
            path: lock_path.to_path_buf(),
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Release failure is unreportable from Drop; closing the handle
        // releases the advisory lock anyway.
        let _ = fs2::FileExt::unlock(&self.file);
        trace!(path = %self.path.display(), "lock released");
    }
}

/// Run `op` while holding an exclusive lock on `lock_path`.
///
/// The lock is released on every exit path before this function returns,
/// whether `op` succeeds or fails.
///
/// # Errors
///
/// Returns an I/O error if the lock cannot be acquired, or whatever error
/// `op` itself produces.
pub fn with_lock<T>(lock_path: &Path, op: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = FileLock::acquire(lock_path)?;
    op()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_lock_file() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("meta.json.lock");

        let guard = FileLock::acquire(&lock_path).unwrap();
        assert!(lock_path.exists());
        drop(guard);
    }

    #[test]
    fn test_reacquire_after_release() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("meta.json.lock");

        drop(FileLock::acquire(&lock_path).unwrap());
        drop(FileLock::acquire(&lock_path).unwrap());
    }

    #[test]
    fn test_lock_released_on_error_path() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("meta.json.lock");

        let result: Result<()> = with_lock(&lock_path, || {
            Err(crate::Error::Config("simulated failure".to_string()))
        });
        assert!(result.is_err());

        // A second acquisition would deadlock if the error path leaked the lock.
        with_lock(&lock_path, || Ok(())).unwrap();
    }

    #[test]
    fn test_guarded_sections_never_overlap() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("meta.json.lock");
        let active = Arc::new(Mutex::new(0_u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock_path = lock_path.clone();
            let active = Arc::clone(&active);
            handles.push(thread::spawn(move || {
                with_lock(&lock_path, || {
                    {
                        let mut n = active.lock().unwrap();
                        *n += 1;
                        assert_eq!(*n, 1, "two lock holders overlapped");
                    }
                    thread::sleep(Duration::from_millis(5));
                    {
                        let mut n = active.lock().unwrap();
                        *n -= 1;
                    }
                    Ok(())
                })
                .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_distinct_paths_do_not_contend() {
        let dir = TempDir::new().unwrap();
        let first = FileLock::acquire(&dir.path().join("a.lock")).unwrap();
        // Would block forever if distinct paths shared a lock.
        let second = FileLock::acquire(&dir.path().join("b.lock")).unwrap();
        drop((first, second));
    }
}
