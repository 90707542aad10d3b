// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::gateway::api::auth::ServiceAuth;
use crate::gateway::api::types::{ApiError, TokenRequest, TokenResponse};
use crate::gateway::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};
use std::time::Duration;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/media/token", post(issue_token))
}

/// POST /api/media/token
///
/// Requires `Authorization: Bearer <gateway.service_secret>`. The caller is
/// the application backend, which has already authenticated `user_id`.
pub async fn issue_token(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let tokens = &state.engine.tokens;

    let token = tokens
        .issue_for_media(
            request.user_id.as_deref(),
            &request.media_id,
            request.ttl_secs.map(Duration::from_secs),
        )
        .await
        .inspect_err(|e| {
            if e.is_retryable() {
                tracing::warn!(media = %request.media_id, error = %e, "token issuance failed on store access");
            }
        })?;

    let url = token.playback_url(tokens.base_url());
    Ok(Json(TokenResponse { token, url }))
}
