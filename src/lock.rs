use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Cache-directory lock guard that removes the lock file on drop.
///
/// `serve` holds this for its lifetime so two servers never sweep the same
/// cache directory.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        // Best-effort unlock; ignore errors
        let _ = self.file.unlock();

        let path = self.path.clone();
        for _ in 0..10 {
            if !path.exists() {
                break;
            }
            if fs::remove_file(&path).is_ok() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }
}

/// Acquire a non-blocking exclusive lock inside the cache directory.
pub fn acquire_cache_lock(cache_dir: &Path) -> io::Result<CacheLock> {
    fs::create_dir_all(cache_dir)?;
    let p = cache_dir.join(".ordforge.lock");
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(&p)?;
    match f.try_lock_exclusive() {
        Ok(()) => Ok(CacheLock { file: f, path: p }),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(io::Error::other(format!(
            "another ordforge server is already serving {} (lock held)",
            cache_dir.display()
        ))),
        Err(e) => Err(e),
    }
}
