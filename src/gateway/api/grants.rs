// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::gateway::api::auth::TriggerAuth;
use crate::gateway::api::types::ApiError;
use crate::gateway::AppState;
use crate::grants::ReconcileReport;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/grants/reconcile/{user_id}", post(reconcile_user))
}

/// POST /api/grants/reconcile/{user_id}
///
/// Partial failures still answer 200; the report lists them under `errors`.
pub async fn reconcile_user(
    _auth: TriggerAuth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let report = state.engine.reconciler.reconcile_user(&user_id).await?;
    Ok(Json(report))
}
