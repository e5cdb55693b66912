use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Child;

use crate::core::{errors::CameraError, state::CameraStatus};

use super::pipeline::{Destination, Pipeline};

/// Process and network I/O used by camera sources.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Spawns a long-lived process that keeps overwriting `output` with the
    /// latest frame of `source`.
    async fn spawn_snapshot_stream(
        &self,
        source: &str,
        output: &Path,
    ) -> Result<Child, CameraError>;

    /// Downloads a still image from `url` into `output`.
    async fn fetch_snapshot(&self, url: &str, output: &Path) -> Result<(), CameraError>;
}

/// What the host can ask of a camera, whatever kind it is.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Builds, without running it, the pipeline that delivers `quality` to
    /// `destination` as FLV over TCP.
    async fn stream_command(
        &self,
        quality: &str,
        stream_name: &str,
        destination: &Destination,
    ) -> Result<Pipeline, CameraError>;

    /// Returns the path of the current still image. The file may not exist
    /// yet when stills come from a freshly started background process.
    async fn snapshot(&self) -> Result<PathBuf, CameraError>;

    async fn stream_source(&self, quality: &str) -> Result<String, CameraError>;

    async fn status(&self) -> CameraStatus;

    /// Stops all background work owned by the camera.
    async fn close(&self) -> Result<(), CameraError>;
}
