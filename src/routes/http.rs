//! HTTP endpoint handlers. These are thin wrappers that forward to the pipeline
//! and the store. Batch generation is CPU-bound and runs on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, instrument};

use crate::error::GenerateError;
use crate::protocol::*;
use crate::review::export_csv;
use crate::state::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorOut { error: message.into() })).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthOut { ok: true, stored: state.store().len() })
}

#[instrument(level = "info", skip(state), fields(domain = %body.domain, count = body.count, difficulty = body.difficulty))]
pub async fn http_post_batch(State(state): State<Arc<AppState>>, Json(body): Json<BatchIn>) -> Response {
    let pipeline = state.pipeline.clone();
    let joined = tokio::task::spawn_blocking(move || {
        pipeline.generate_batch_seeded(&body.domain, body.count, body.difficulty, body.seed)
    })
    .await;

    match joined {
        Ok(Ok(report)) => {
            info!(target: "qgen", seed = report.seed, accepted = report.accepted.len(), "HTTP batch served");
            Json(batch_out(&report)).into_response()
        }
        Ok(Err(e @ (GenerateError::UnknownDomain(_) | GenerateError::InvalidDifficulty(_)))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            error!(target: "qgen", error = %e, "Batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!(target: "qgen", error = %e, "Batch task panicked or was cancelled");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "batch task failed")
        }
    }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_answer(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store().get(&id) {
        Some(q) => Json(answer_out(&q)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no question with id {id}")),
    }
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_flag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<FlagIn>,
) -> Response {
    if body.note.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "a flag needs a note for the reviewer");
    }
    match state.store().flag(&id, body.note.trim()) {
        Ok(Some(q)) => Json(to_out(&q)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("no question with id {id}")),
        Err(e) => {
            error!(target: "qgen", %id, error = %e, "Flagging failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_review_csv(State(state): State<Arc<AppState>>) -> Response {
    let questions = state.store().all();
    let mut buf = Vec::new();
    match export_csv(&questions, &mut buf) {
        Ok(rows) => {
            info!(target: "qgen", rows, "Review sheet exported");
            ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], buf).into_response()
        }
        Err(e) => {
            error!(target: "qgen", error = %e, "Review export failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
