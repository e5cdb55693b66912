use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    config::MjpegArgs,
    core::{
        errors::CameraError,
        state::{CameraStatus, SnapshotMode},
    },
};

use super::{
    pipeline::{Destination, Pipeline, Stage},
    snapshot_process::SnapshotProcess,
    stream::{EncodeProfile, StreamQuality},
    traits::{CameraBackend, CameraSource},
    workdir::SnapshotWorkDir,
};

/// A camera that serves MJPEG over HTTP.
///
/// Stills come from `snapshot_url` when one is configured, otherwise from a
/// background ffmpeg process that keeps `screen.jpg` in the work dir fresh.
pub struct MjpegCamera<B: CameraBackend> {
    args: MjpegArgs,
    encode: EncodeProfile,
    backend: B,
    // dropped before work_dir: the child must be killed before its output
    // dir is removed
    snapshot_stream: SnapshotProcess,
    work_dir: SnapshotWorkDir,
}

impl<B: CameraBackend> MjpegCamera<B> {
    /// Starts the snapshot stream right away when there is no snapshot URL.
    pub async fn new(
        args: MjpegArgs,
        encode: EncodeProfile,
        backend: B,
        work_dir: SnapshotWorkDir,
    ) -> Result<Self, CameraError> {
        let camera = Self {
            args,
            encode,
            backend,
            snapshot_stream: SnapshotProcess::new(),
            work_dir,
        };

        info!(
            "MJPEG camera ready: source={} snapshot_mode={:?} work_dir={}",
            camera.args.source,
            camera.snapshot_mode(),
            camera.work_dir.path().display()
        );
        if camera.snapshot_mode() == SnapshotMode::Stream {
            camera.start_snapshot_stream().await?;
        }

        Ok(camera)
    }

    pub fn snapshot_mode(&self) -> SnapshotMode {
        if self.args.snapshot_url.is_some() {
            SnapshotMode::Fetch
        } else {
            SnapshotMode::Stream
        }
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.work_dir.snapshot_path()
    }

    async fn start_snapshot_stream(&self) -> Result<(), CameraError> {
        self.snapshot_stream
            .ensure_running(&self.backend, &self.args.source, &self.snapshot_path())
            .await
    }
}

#[async_trait]
impl<B: CameraBackend> CameraSource for MjpegCamera<B> {
    async fn stream_command(
        &self,
        quality: &str,
        stream_name: &str,
        destination: &Destination,
    ) -> Result<Pipeline, CameraError> {
        let parsed: StreamQuality = quality.parse()?;
        if parsed != StreamQuality::Video1 {
            return Err(CameraError::UnsupportedQuality(quality.to_owned()));
        }

        let source = self.stream_source(quality).await?;
        let encode = self.encode.mjpeg_to_flv(parsed, &source, stream_name);
        let mut pipeline = Pipeline::new().then(Stage::Encode(encode));
        if let Some(sync) = self.encode.timestamp_sync() {
            pipeline = pipeline.then(sync);
        }
        let pipeline = pipeline.then(self.encode.delivery(destination));

        debug!("stream command for {stream_name}: {pipeline}");
        Ok(pipeline)
    }

    async fn snapshot(&self) -> Result<PathBuf, CameraError> {
        let img_file = self.snapshot_path();

        match &self.args.snapshot_url {
            Some(url) => self.backend.fetch_snapshot(url, &img_file).await?,
            None => self.start_snapshot_stream().await?,
        }

        Ok(img_file)
    }

    async fn stream_source(&self, _quality: &str) -> Result<String, CameraError> {
        Ok(self.args.source.clone())
    }

    async fn status(&self) -> CameraStatus {
        CameraStatus {
            snapshot_mode: self.snapshot_mode(),
            snapshot_process: self.snapshot_stream.state().await,
            snapshot_pid: self.snapshot_stream.pid().await,
        }
    }

    async fn close(&self) -> Result<(), CameraError> {
        self.snapshot_stream.terminate().await
    }
}
