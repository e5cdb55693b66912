use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::AsyncReadExt,
    process::{Child, ChildStdout, Command},
    time::{sleep, timeout},
};

use crate::core::{errors::CameraError, state::ProcessState};

use super::{snapshot_process::SnapshotProcess, traits::CameraBackend};

/// Backend whose "snapshot stream" is a shell command; counts spawns and
/// fetches.
///
/// The script gets the output path as `$1`. Each child's stdout is kept so a
/// test can see it exit: the read hits EOF once the process is gone.
#[derive(Clone)]
pub struct MockBackend {
    script: &'static str,
    fail_fetch: bool,
    failing_spawns: Arc<AtomicUsize>,
    pub spawns: Arc<AtomicUsize>,
    pub fetches: Arc<Mutex<Vec<(String, PathBuf)>>>,
    stdouts: Arc<Mutex<Vec<ChildStdout>>>,
}

impl MockBackend {
    pub fn long_running() -> Self {
        Self::with_script("exec sleep 30")
    }

    pub fn exiting() -> Self {
        Self::with_script("exit 0")
    }

    /// Rewrites the output file as fast as it can.
    pub fn writing_frames() -> Self {
        Self::with_script(r#"while :; do echo frame > "$1"; done"#)
    }

    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::long_running()
        }
    }

    /// The first `count` spawns fail, later ones run a long-lived process.
    pub fn failing_spawns(count: usize) -> Self {
        Self {
            failing_spawns: Arc::new(AtomicUsize::new(count)),
            ..Self::long_running()
        }
    }

    fn with_script(script: &'static str) -> Self {
        Self {
            script,
            fail_fetch: false,
            failing_spawns: Arc::new(AtomicUsize::new(0)),
            spawns: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(Mutex::new(Vec::new())),
            stdouts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Waits until the most recently spawned child has exited.
    pub async fn wait_for_last_exit(&self) {
        let mut stdout = self
            .stdouts
            .lock()
            .expect("stdout list lock")
            .pop()
            .expect("a child should have been spawned");
        let mut rest = Vec::new();
        timeout(Duration::from_secs(5), stdout.read_to_end(&mut rest))
            .await
            .expect("child should exit")
            .expect("child stdout should be readable");
    }
}

#[async_trait]
impl CameraBackend for MockBackend {
    async fn spawn_snapshot_stream(
        &self,
        _source: &str,
        output: &Path,
    ) -> Result<Child, CameraError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failing_spawns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if fail {
            return Err(CameraError::ProcessSpawn {
                command: self.script.to_owned(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(self.script)
            .arg("sh")
            .arg(output)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CameraError::ProcessSpawn {
                command: self.script.to_owned(),
                source,
            })?;
        if let Some(stdout) = child.stdout.take() {
            self.stdouts.lock().expect("stdout list lock").push(stdout);
        }
        Ok(child)
    }

    async fn fetch_snapshot(&self, url: &str, output: &Path) -> Result<(), CameraError> {
        self.fetches
            .lock()
            .expect("fetch log lock")
            .push((url.to_owned(), output.to_path_buf()));
        if self.fail_fetch {
            return Err(CameraError::Fetch {
                url: url.to_owned(),
                reason: "unexpected status 503 Service Unavailable".to_owned(),
            });
        }
        tokio::fs::write(output, b"test").await?;
        Ok(())
    }
}

pub async fn wait_for_state(process: &SnapshotProcess, expected: ProcessState) {
    for _ in 0..100 {
        if process.state().await == expected {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("snapshot process never reached {expected:?}");
}
