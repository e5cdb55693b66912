use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("unsupported stream quality `{0}`: MJPEG cameras only support video1")]
    UnsupportedQuality(String),

    #[error("failed to spawn `{command}`: {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch snapshot from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("snapshot path {0:?} is not valid UTF-8")]
    NonUtf8Path(std::path::PathBuf),

    #[error("snapshot work dir error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CameraError> for AppError {
    fn from(value: CameraError) -> Self {
        let status = match &value {
            CameraError::UnsupportedQuality(_) => StatusCode::BAD_REQUEST,
            CameraError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            CameraError::ProcessSpawn { .. }
            | CameraError::NonUtf8Path(_)
            | CameraError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
