use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-request scratch directory, removed when the guard is closed or dropped.
///
/// The directory name is a fresh UUID, so concurrent requests never share one.
#[derive(Debug)]
pub struct StagingDirectory {
    path: PathBuf,
    released: bool,
}

impl StagingDirectory {
    pub fn create(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let path = root.join(Uuid::new_v4().to_string());
        std::fs::create_dir(&path)?;

        tracing::debug!("Created staging directory {}", path.display());
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory and reports the outcome.
    pub fn close(mut self) -> io::Result<()> {
        self.released = true;
        remove_if_present(&self.path)
    }
}

impl Drop for StagingDirectory {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            tracing::warn!(
                "Failed to remove staging directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::debug!("Removed staging directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
