//! Axum trigger surface for the RWB worker.
//!
//! One JSON endpoint accepts a job id plus an optional column-rename
//! mapping, guarded by a shared secret from the upstream web app. Transport
//! framing and user authentication live upstream.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rwb_core::WorkerError;
use rwb_pipeline::JobRunner;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

pub const CRATE_NAME: &str = "rwb-web";

const SECRET_HEADER: &str = "x-rwb-secret";

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<JobRunner>,
    pub shared_secret: String,
}

#[derive(Debug, Deserialize, Default)]
struct ProcessRequest {
    #[serde(default)]
    job_id: i64,
    #[serde(default)]
    mapping: Option<HashMap<String, String>>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/jobs/process", post(process_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "worker trigger listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn healthz_handler() -> Response {
    Json(serde_json::json!({"ok": true})).into_response()
}

async fn process_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ProcessRequest>,
) -> Response {
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != state.shared_secret {
        return error_body(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    if payload.job_id == 0 {
        return error_body(StatusCode::BAD_REQUEST, "missing job_id");
    }

    match state.runner.run(payload.job_id, payload.mapping.as_ref()).await {
        Ok(outcome) => Json(serde_json::json!({
            "ok": true,
            "job_id": outcome.job_id,
            "brief_id": outcome.brief_id,
            "pdf_path": outcome.pdf_path,
        }))
        .into_response(),
        Err(err) => {
            let status = match &err {
                WorkerError::NotFound(_) => StatusCode::NOT_FOUND,
                WorkerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_body(status, &format!("job processing failed: {err}"))
        }
    }
}

fn error_body(status: StatusCode, detail: &str) -> Response {
    (status, Json(serde_json::json!({"detail": detail}))).into_response()
}
