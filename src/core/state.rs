use serde::Serialize;

/// Lifecycle of the background snapshot process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Absent,
    Running,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    /// Stills are downloaded from a dedicated snapshot URL.
    Fetch,
    /// Stills are written continuously by a background ffmpeg process.
    Stream,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraStatus {
    pub snapshot_mode: SnapshotMode,
    pub snapshot_process: ProcessState,
    pub snapshot_pid: Option<u32>,
}
