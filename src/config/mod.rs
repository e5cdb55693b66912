use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use clap::Args;

use crate::camera::stream::{EncodeProfile, PipelineTools, split_args};

/// Options of an MJPEG camera, flattened into the host command line.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct MjpegArgs {
    /// HTTP URL to stream MJPEG from
    #[arg(long, short = 's', env = "MJPEG_SOURCE")]
    pub source: String,

    /// HTTP URL to fetch JPEG snapshot image from
    #[arg(long, short = 'i', env = "MJPEG_SNAPSHOT_URL")]
    pub snapshot_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_dir: PathBuf,
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_fetch_timeout: Duration,
    pub encode: EncodeProfile,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_owned())
            .parse()?;
        let log_dir = env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"));
        let snapshot_dir = non_empty("SNAPSHOT_DIR").map(PathBuf::from);
        let snapshot_fetch_timeout = env::var("SNAPSHOT_FETCH_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let defaults = PipelineTools::default();
        let tools = PipelineTools {
            ffmpeg: non_empty("FFMPEG_BIN").unwrap_or(defaults.ffmpeg),
            clock_sync: non_empty("CLOCK_SYNC_BIN").unwrap_or(defaults.clock_sync),
            netcat: non_empty("NETCAT_BIN").unwrap_or(defaults.netcat),
        };
        let needs_flv_timestamps = env::var("FLV_TIMESTAMPS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let encode = EncodeProfile {
            tools,
            base_args: split_args(&env::var("FFMPEG_BASE_ARGS").unwrap_or_default()),
            extra_args: split_args(&env::var("FFMPEG_EXTRA_ARGS").unwrap_or_default()),
            needs_flv_timestamps,
        };

        Ok(Self {
            bind_addr,
            log_dir,
            snapshot_dir,
            snapshot_fetch_timeout,
            encode,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
