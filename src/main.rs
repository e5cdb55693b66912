use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mjpeg_bridge::{
    app_state::{AppState, CameraKind, open_camera},
    camera::{pipeline::Destination, traits::CameraSource},
    config::{AppConfig, MjpegArgs},
    web,
};
use tokio::{
    process::Command,
    time::{Instant, sleep},
};
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

/// Bridges an MJPEG-over-HTTP camera to an FLV ingest endpoint
#[derive(Parser)]
#[command(name = "mjpeg-bridge", version)]
struct Cli {
    /// Camera implementation to use
    #[arg(long, value_enum, default_value_t = CameraKind::Mjpeg)]
    kind: CameraKind,

    #[command(flatten)]
    camera: MjpegArgs,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve snapshots, status and stream commands over HTTP
    Serve,
    /// Print the shell pipeline that streams the camera to a TCP endpoint
    StreamCommand {
        #[arg(long, default_value = "video1")]
        quality: String,

        #[arg(long)]
        stream_name: String,

        /// Ingest endpoint as host:port
        #[arg(long)]
        destination: Destination,

        /// Execute the pipeline through `sh -c` instead of printing it
        #[arg(long)]
        run: bool,
    },
    /// Resolve the current snapshot and copy it to a file
    Snapshot {
        #[arg(long, short)]
        output: PathBuf,

        /// How long to wait for the capture stream's first frame
        #[arg(long, default_value_t = 5)]
        wait_seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let _log_guard = if matches!(cli.command, Mode::Serve) {
        tokio::fs::create_dir_all(&config.log_dir).await?;
        let file_appender = rolling::daily(&config.log_dir, "mjpeg-bridge.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_max_level(tracing::Level::INFO)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
        None
    };

    let camera = open_camera(cli.kind, cli.camera, &config).await?;
    let result = match cli.command {
        Mode::Serve => serve(camera.clone(), &config).await,
        Mode::StreamCommand {
            quality,
            stream_name,
            destination,
            run,
        } => stream_command(camera.as_ref(), &quality, &stream_name, &destination, run).await,
        Mode::Snapshot {
            output,
            wait_seconds,
        } => snapshot(camera.as_ref(), &output, Duration::from_secs(wait_seconds)).await,
    };

    if let Err(err) = camera.close().await {
        warn!("failed to close camera: {err}");
    }
    result
}

async fn serve(camera: Arc<dyn CameraSource>, config: &AppConfig) -> Result<()> {
    let state = Arc::new(AppState::new(camera));
    let app = web::routes::build_router(state);

    info!("mjpeg-bridge listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}

async fn stream_command(
    camera: &dyn CameraSource,
    quality: &str,
    stream_name: &str,
    destination: &Destination,
    run: bool,
) -> Result<()> {
    let pipeline = camera
        .stream_command(quality, stream_name, destination)
        .await?;
    let command = pipeline.to_shell();
    if !run {
        println!("{command}");
        return Ok(());
    }

    info!("running stream pipeline: {command}");
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .kill_on_drop(true)
        .spawn()
        .context("failed to spawn stream pipeline")?;

    tokio::select! {
        status = child.wait() => {
            let status = status.context("failed to wait for stream pipeline")?;
            if !status.success() {
                bail!("stream pipeline exited with {status}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("stopping stream pipeline");
            child.kill().await.context("failed to stop stream pipeline")?;
        }
    }

    Ok(())
}

async fn snapshot(camera: &dyn CameraSource, output: &Path, wait: Duration) -> Result<()> {
    let path = camera.snapshot().await?;

    // the capture stream writes its first frame a moment after it starts
    let deadline = Instant::now() + wait;
    while !tokio::fs::try_exists(&path).await.unwrap_or(false) && Instant::now() < deadline {
        sleep(Duration::from_millis(200)).await;
    }

    let bytes = tokio::fs::copy(&path, output).await.with_context(|| {
        format!(
            "snapshot {} is not available; the capture stream may still be starting",
            path.display()
        )
    })?;
    println!("{} ({bytes} bytes)", output.display());
    Ok(())
}
