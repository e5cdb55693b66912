use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::errors::CameraError;

pub const SNAPSHOT_FILE_NAME: &str = "screen.jpg";

/// Directory private to one camera that holds its `screen.jpg`.
#[derive(Debug)]
pub enum SnapshotWorkDir {
    /// Removed from disk when dropped.
    Scoped(TempDir),
    /// Supplied by the caller, who keeps ownership of its cleanup.
    Provided(PathBuf),
}

impl SnapshotWorkDir {
    pub fn scoped() -> Result<Self, CameraError> {
        let dir = tempfile::Builder::new()
            .prefix("mjpeg-snapshot-")
            .tempdir()?;
        Ok(Self::Scoped(dir))
    }

    pub fn provided(path: impl Into<PathBuf>) -> Result<Self, CameraError> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        Ok(Self::Provided(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Scoped(dir) => dir.path(),
            Self::Provided(path) => path,
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.path().join(SNAPSHOT_FILE_NAME)
    }
}
