// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::gateway::api::auth::TriggerAuth;
use crate::gateway::api::types::ApiError;
use crate::gateway::AppState;
use crate::scheduler::SchedulerReport;
use axum::{extract::State, response::Json, routing::post, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/scheduler/privilege-expiry", post(run_privilege_expiry))
}

/// POST /api/scheduler/privilege-expiry — one scheduler pass, no payload.
pub async fn run_privilege_expiry(
    _auth: TriggerAuth,
    State(state): State<AppState>,
) -> Result<Json<SchedulerReport>, ApiError> {
    let report = state.engine.scheduler.run_once().await?;
    Ok(Json(report))
}
