use std::path::Path;

use tokio::{process::Child, sync::Mutex};
use tracing::{debug, info, warn};

use crate::core::{errors::CameraError, state::ProcessState};

use super::traits::CameraBackend;

/// Owns the single background process that keeps the snapshot file fresh.
///
/// The handle lives behind one mutex so the "is it alive, otherwise spawn"
/// sequence can never race into two live processes.
#[derive(Default)]
pub struct SnapshotProcess {
    child: Mutex<Option<Child>>,
}

impl SnapshotProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure_running<B: CameraBackend>(
        &self,
        backend: &B,
        source: &str,
        output: &Path,
    ) -> Result<(), CameraError> {
        let mut child = self.child.lock().await;
        if let Some(running) = child.as_mut() {
            if poll(running) == ProcessState::Running {
                debug!("snapshot stream already running");
                return Ok(());
            }
            info!("snapshot stream exited, respawning");
        }

        let spawned = backend.spawn_snapshot_stream(source, output).await?;
        *child = Some(spawned);
        Ok(())
    }

    pub async fn state(&self) -> ProcessState {
        let mut child = self.child.lock().await;
        match child.as_mut() {
            Some(running) => poll(running),
            None => ProcessState::Absent,
        }
    }

    /// OS pid of the current process, if one is held and not yet reaped.
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }

    /// Hard-kills the process if there is one. Calling it again is a no-op.
    ///
    /// The handle stays locked until the child is reaped, so a concurrent
    /// `ensure_running` only spawns once the old process is gone.
    pub async fn terminate(&self) -> Result<(), CameraError> {
        let mut child = self.child.lock().await;
        let Some(mut running) = child.take() else {
            return Ok(());
        };

        if let Err(err) = running.kill().await {
            // kill fails with InvalidInput once the child has been reaped
            if err.kind() != std::io::ErrorKind::InvalidInput {
                warn!("failed to kill snapshot stream: {err}");
                return Err(err.into());
            }
        }
        info!("snapshot stream terminated");
        Ok(())
    }
}

fn poll(child: &mut Child) -> ProcessState {
    match child.try_wait() {
        Ok(None) => ProcessState::Running,
        Ok(Some(status)) => {
            debug!("snapshot stream exited with {status}");
            ProcessState::Dead
        }
        Err(err) => {
            warn!("failed to poll snapshot stream: {err}");
            ProcessState::Dead
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Arc};

    use tokio::task::JoinSet;

    use crate::{
        camera::testing::{MockBackend, wait_for_state},
        core::{errors::CameraError, state::ProcessState},
    };

    use super::SnapshotProcess;

    const SOURCE: &str = "http://cam/stream.mjpg";

    #[tokio::test]
    async fn starts_absent() {
        let process = SnapshotProcess::new();
        assert_eq!(process.state().await, ProcessState::Absent);
    }

    #[tokio::test]
    async fn ensure_running_is_idempotent_while_alive() {
        let backend = MockBackend::long_running();
        let process = SnapshotProcess::new();
        let output = Path::new("/tmp/screen.jpg");

        process
            .ensure_running(&backend, SOURCE, output)
            .await
            .expect("first ensure should spawn");
        process
            .ensure_running(&backend, SOURCE, output)
            .await
            .expect("second ensure should be a no-op");

        assert_eq!(backend.spawn_count(), 1);
        assert_eq!(process.state().await, ProcessState::Running);

        process.terminate().await.expect("terminate should succeed");
    }

    #[tokio::test]
    async fn respawns_once_after_exit() {
        let backend = MockBackend::exiting();
        let process = SnapshotProcess::new();
        let output = Path::new("/tmp/screen.jpg");

        process
            .ensure_running(&backend, SOURCE, output)
            .await
            .expect("ensure should spawn");
        wait_for_state(&process, ProcessState::Dead).await;

        process
            .ensure_running(&backend, SOURCE, output)
            .await
            .expect("ensure should respawn");
        assert_eq!(backend.spawn_count(), 2);
    }

    #[tokio::test]
    async fn terminate_twice_leaves_absent() {
        let backend = MockBackend::long_running();
        let process = SnapshotProcess::new();

        process
            .ensure_running(&backend, SOURCE, Path::new("/tmp/screen.jpg"))
            .await
            .expect("ensure should spawn");

        process.terminate().await.expect("first terminate should succeed");
        process.terminate().await.expect("second terminate should succeed");
        assert_eq!(process.state().await, ProcessState::Absent);
    }

    #[tokio::test]
    async fn terminate_of_dead_process_leaves_absent() {
        let backend = MockBackend::exiting();
        let process = SnapshotProcess::new();

        process
            .ensure_running(&backend, SOURCE, Path::new("/tmp/screen.jpg"))
            .await
            .expect("ensure should spawn");
        wait_for_state(&process, ProcessState::Dead).await;

        process.terminate().await.expect("terminate should succeed");
        assert_eq!(process.state().await, ProcessState::Absent);
    }

    #[tokio::test]
    async fn failed_spawn_leaves_absent_and_next_call_retries() {
        let backend = MockBackend::failing_spawns(1);
        let process = SnapshotProcess::new();
        let output = Path::new("/tmp/screen.jpg");

        let err = process
            .ensure_running(&backend, SOURCE, output)
            .await
            .expect_err("first spawn should fail");
        assert!(matches!(err, CameraError::ProcessSpawn { .. }));
        assert_eq!(process.state().await, ProcessState::Absent);
        assert!(process.pid().await.is_none());

        process
            .ensure_running(&backend, SOURCE, output)
            .await
            .expect("second ensure should spawn");
        assert_eq!(backend.spawn_count(), 2);
        assert_eq!(process.state().await, ProcessState::Running);

        process.terminate().await.expect("terminate should succeed");
    }

    #[tokio::test]
    async fn terminate_holds_the_handle_until_the_child_is_reaped() {
        let backend = MockBackend::long_running();
        let process = SnapshotProcess::new();
        process
            .ensure_running(&backend, SOURCE, Path::new("/tmp/screen.jpg"))
            .await
            .expect("ensure should spawn");

        let mut terminate = std::pin::pin!(process.terminate());
        let finished = tokio::select! {
            biased;
            result = &mut terminate => Some(result),
            _ = std::future::ready(()) => None,
        };
        match finished {
            Some(result) => result.expect("terminate should succeed"),
            None => {
                assert!(
                    process.child.try_lock().is_err(),
                    "handle was released while the kill was still pending"
                );
                terminate.await.expect("terminate should succeed");
            }
        }

        assert_eq!(process.state().await, ProcessState::Absent);
    }

    #[tokio::test]
    async fn concurrent_callers_spawn_one_process() {
        let backend = MockBackend::long_running();
        let process = Arc::new(SnapshotProcess::new());

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let backend = backend.clone();
            let process = process.clone();
            tasks.spawn(async move {
                process
                    .ensure_running(&backend, SOURCE, Path::new("/tmp/screen.jpg"))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result
                .expect("task should not panic")
                .expect("ensure should succeed");
        }

        assert_eq!(backend.spawn_count(), 1);
        process.terminate().await.expect("terminate should succeed");
    }
}
