use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use serde::Serialize;

use fieldgate_core::errors::ApprovalError;

use crate::service::ApprovalService;
use crate::{requests, thresholds};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ApprovalService>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ApiError>);

/// Maps the approval error taxonomy onto HTTP statuses. `NotFound` is kept
/// distinct from storage failures so callers can render 404 vs 500.
pub fn error_response(error: ApprovalError) -> ErrorResponse {
    let status = match &error {
        ApprovalError::Unauthorized => StatusCode::UNAUTHORIZED,
        ApprovalError::NotFound { .. } => StatusCode::NOT_FOUND,
        ApprovalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApprovalError::InvalidStateTransition(_) => StatusCode::CONFLICT,
        ApprovalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError { error: error.to_string() }))
}

pub fn router(state: AppState) -> Router {
    Router::new().merge(thresholds::router(state.clone())).merge(requests::router(state))
}
