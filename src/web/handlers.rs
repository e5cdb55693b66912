use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::{
    app_state::AppState,
    camera::pipeline::{Destination, Pipeline},
    core::{errors::AppError, state::CameraStatus},
};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct StreamCommandQuery {
    quality: String,
    stream_name: String,
    host: String,
    port: u16,
}

#[derive(Serialize)]
pub struct StreamCommandResponse {
    command: String,
    pipeline: Pipeline,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<CameraStatus> {
    Json(state.camera.status().await)
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let snapshot_path = state.camera.snapshot().await?;

    let data = match fs::read(&snapshot_path).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::new(
                StatusCode::NOT_FOUND,
                "no snapshot frame captured yet; retry shortly",
            ));
        }
        Err(err) => {
            return Err(AppError::internal(format!(
                "failed to read snapshot {}: {err}",
                snapshot_path.display()
            )));
        }
    };

    info!("snapshot served ({} bytes)", data.len());
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((StatusCode::OK, headers, data).into_response())
}

pub async fn stream_command(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamCommandQuery>,
) -> Result<Json<StreamCommandResponse>, AppError> {
    let destination = Destination::checked(query.host, query.port)
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err))?;
    let pipeline = state
        .camera
        .stream_command(&query.quality, &query.stream_name, &destination)
        .await?;

    info!(
        "stream command built for {} ({}) -> {destination}",
        query.stream_name, query.quality
    );
    Ok(Json(StreamCommandResponse {
        command: pipeline.to_shell(),
        pipeline,
    }))
}
