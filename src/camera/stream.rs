use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::core::errors::CameraError;

use super::pipeline::{Command, Delivery, Destination, FfmpegInvocation, Stage};

/// Stream quality identifiers used by the ingest endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamQuality {
    Video1,
    Video2,
    Video3,
}

impl StreamQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamQuality::Video1 => "video1",
            StreamQuality::Video2 => "video2",
            StreamQuality::Video3 => "video3",
        }
    }
}

impl fmt::Display for StreamQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamQuality {
    type Err = CameraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "video1" => Ok(StreamQuality::Video1),
            "video2" => Ok(StreamQuality::Video2),
            "video3" => Ok(StreamQuality::Video3),
            other => Err(CameraError::UnsupportedQuality(other.to_owned())),
        }
    }
}

/// Executables used by stream pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTools {
    pub ffmpeg: String,
    pub clock_sync: String,
    pub netcat: String,
}

impl Default for PipelineTools {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_owned(),
            clock_sync: "clock-sync".to_owned(),
            netcat: "nc".to_owned(),
        }
    }
}

/// Encoding inputs decided by the host rather than by the camera.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeProfile {
    pub tools: PipelineTools,
    pub base_args: Vec<String>,
    pub extra_args: Vec<String>,
    /// Whether the FLV output must be piped through the clock-sync filter.
    pub needs_flv_timestamps: bool,
}

impl EncodeProfile {
    pub fn base_args(&self, _quality: StreamQuality) -> &[String] {
        &self.base_args
    }

    pub fn extra_args(&self, _quality: StreamQuality) -> &[String] {
        &self.extra_args
    }

    /// Decode stage for an MJPEG input, re-encoded to FLV on stdout.
    pub fn mjpeg_to_flv(
        &self,
        quality: StreamQuality,
        source: &str,
        stream_name: &str,
    ) -> FfmpegInvocation {
        let mut input_args: Vec<String> = ["-f", "mjpeg", "-nostdin", "-loglevel", "error", "-y"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        input_args.extend(self.base_args(quality).iter().cloned());

        FfmpegInvocation {
            program: self.tools.ffmpeg.clone(),
            input_args,
            input: source.to_owned(),
            output_args: self.extra_args(quality).to_vec(),
            metadata: vec![("streamName".to_owned(), stream_name.to_owned())],
            output_format: "flv".to_owned(),
            video_codec: "flv".to_owned(),
            output: "-".to_owned(),
        }
    }

    pub fn timestamp_sync(&self) -> Option<Stage> {
        self.needs_flv_timestamps.then(|| {
            Stage::TimestampSync(Command::new(&self.tools.clock_sync).arg("--write-timestamps"))
        })
    }

    pub fn delivery(&self, destination: &Destination) -> Stage {
        Stage::Deliver(Delivery {
            program: self.tools.netcat.clone(),
            destination: destination.clone(),
        })
    }
}

/// Splits a whitespace separated argument list as found in env config.
pub fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_owned).collect()
}
