//! Static asset and font placement.
//!
//! Assets are copied verbatim, preserving the directory structure.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Asset copy errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A file outside the source tree.
    #[error("invalid asset path: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Recursive copier from one source directory to one destination.
#[derive(Debug, Clone)]
pub struct AssetCopier {
    source: PathBuf,
    dest: PathBuf,
}

impl AssetCopier {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// Copy every file; returns the number copied.
    ///
    /// A missing source directory is logged and yields zero.
    pub fn copy(&self) -> Result<usize> {
        if !self.source.is_dir() {
            warn!(source = %self.source.display(), "asset directory not found, skipping");
            return Ok(0);
        }

        let mut count = 0;
        self.copy_dir(&self.source, &mut count)?;
        info!(
            source = %self.source.display(),
            dest = %self.dest.display(),
            count,
            "copied assets"
        );
        Ok(count)
    }

    fn copy_dir(&self, dir: &Path, count: &mut usize) -> Result<()> {
        let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();

            // Skip hidden files/directories
            if path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'))
            {
                continue;
            }

            if path.is_dir() {
                self.copy_dir(&path, count)?;
            } else if path.is_file() {
                self.copy_file(&path)?;
                *count += 1;
            }
        }
        Ok(())
    }

    fn copy_file(&self, path: &Path) -> Result<()> {
        let relative = path
            .strip_prefix(&self.source)
            .map_err(|_| AssetError::InvalidPath(path.to_path_buf()))?;
        let dest = self.dest.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        debug!(src = %path.display(), dest = %dest.display(), "copied asset");
        Ok(())
    }
}
