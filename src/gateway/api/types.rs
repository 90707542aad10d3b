// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::grants::ReconcileError;
use crate::media::{ForbiddenReason, MediaAccessError, SignedMediaToken};
use crate::scheduler::SchedulerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

// ── Media ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Absent for anonymous callers; they only reach open previews.
    pub user_id: Option<String>,
    pub media_id: String,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub token: SignedMediaToken,
    pub url: String,
}

// ── Errors ───────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden(ForbiddenReason),
    NotFound(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "bad_request", "message": message }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "unauthorized" }),
            ),
            ApiError::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "error": "forbidden",
                    "reason": reason,
                    "message": reason.to_string(),
                }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "not_found", "message": message }),
            ),
            ApiError::Unavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": "unavailable", "message": message }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<MediaAccessError> for ApiError {
    fn from(err: MediaAccessError) -> Self {
        match err {
            MediaAccessError::Forbidden(denied) => ApiError::Forbidden(denied.reason),
            MediaAccessError::UnknownAccount(_) | MediaAccessError::UnknownMedia(_) => {
                ApiError::NotFound(err.to_string())
            }
            MediaAccessError::Store(e) => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::UnknownAccount(_) => ApiError::NotFound(err.to_string()),
            ReconcileError::Store(e) => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}
