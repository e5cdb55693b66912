use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;

use crate::{
    camera::{
        ffmpeg_backend::FfmpegBackend, mjpeg::MjpegCamera, traits::CameraSource,
        workdir::SnapshotWorkDir,
    },
    config::{AppConfig, MjpegArgs},
};

/// Camera implementations the host can be configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CameraKind {
    #[default]
    Mjpeg,
}

pub async fn open_camera(
    kind: CameraKind,
    args: MjpegArgs,
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn CameraSource>> {
    let work_dir = match &config.snapshot_dir {
        Some(dir) => SnapshotWorkDir::provided(dir),
        None => SnapshotWorkDir::scoped(),
    }
    .context("failed to prepare snapshot work dir")?;

    match kind {
        CameraKind::Mjpeg => {
            let backend = FfmpegBackend::new(
                config.encode.tools.ffmpeg.clone(),
                config.snapshot_fetch_timeout,
            )?;
            let camera = MjpegCamera::new(args, config.encode.clone(), backend, work_dir)
                .await
                .context("failed to start MJPEG camera")?;
            Ok(Arc::new(camera))
        }
    }
}

pub struct AppState {
    pub camera: Arc<dyn CameraSource>,
}

impl AppState {
    pub fn new(camera: Arc<dyn CameraSource>) -> Self {
        Self { camera }
    }
}
