use std::{path::Path, process::Stdio, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::core::errors::CameraError;

use super::{
    pipeline::{self, shell_quote},
    traits::CameraBackend,
};

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg_bin: String,
    client: Client,
}

impl FfmpegBackend {
    pub fn new(ffmpeg_bin: String, fetch_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(fetch_timeout)
            .build()
            .context("failed to build snapshot http client")?;
        Ok(Self { ffmpeg_bin, client })
    }

    /// Reads `source` in real time at one frame per second and keeps
    /// replacing `output` with the newest frame.
    pub fn snapshot_command(
        &self,
        source: &str,
        output: &Path,
    ) -> Result<pipeline::Command, CameraError> {
        let output = output
            .to_str()
            .ok_or_else(|| CameraError::NonUtf8Path(output.to_path_buf()))?;
        Ok(pipeline::Command::new(&self.ffmpeg_bin)
            .arg("-f")
            .arg("mjpeg")
            .arg("-nostdin")
            .arg("-y")
            .arg("-re")
            .arg("-i")
            .arg(source)
            .arg("-r")
            .arg("1")
            .arg("-update")
            .arg("1")
            .arg(output))
    }
}

#[async_trait]
impl CameraBackend for FfmpegBackend {
    async fn spawn_snapshot_stream(
        &self,
        source: &str,
        output: &Path,
    ) -> Result<Child, CameraError> {
        let command = self.snapshot_command(source, output)?;
        let rendered = command
            .argv()
            .iter()
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ");
        info!("Spawning stream for snapshots: {rendered}");

        Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CameraError::ProcessSpawn {
                command: rendered,
                source,
            })
    }

    async fn fetch_snapshot(&self, url: &str, output: &Path) -> Result<(), CameraError> {
        let fetch_error = |reason: String| {
            warn!("snapshot fetch from {url} failed: {reason}");
            CameraError::Fetch {
                url: url.to_owned(),
                reason,
            }
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| fetch_error(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("unexpected status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| fetch_error(format!("failed to read body: {err}")))?;
        tokio::fs::write(output, &body)
            .await
            .map_err(|err| fetch_error(format!("failed to write {}: {err}", output.display())))?;

        Ok(())
    }
}
