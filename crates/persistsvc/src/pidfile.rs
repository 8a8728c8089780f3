use std::fs;
use std::path::{Path, PathBuf};

/// Holds a pidfile for the process lifetime; removed on drop.
///
/// Grounded on `original_source/persistsvc/persistsvc.py`'s `pidfile`
/// context manager: refuse to start if the file already exists, write our
/// pid, clean up on the way out.
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    pub fn acquire(path: &str) -> anyhow::Result<Self> {
        let path = PathBuf::from(path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        if path.exists() {
            anyhow::bail!(
                "pidfile {} already exists — service may already be running",
                path.display()
            );
        }
        fs::write(&path, std::process::id().to_string())?;
        Ok(Self { path })
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path as &Path);
    }
}
