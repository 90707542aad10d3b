// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod auth;
pub mod grants;
pub mod media;
pub mod scheduler;
pub mod types;

use crate::gateway::AppState;
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(media::router())
        .merge(grants::router())
        .merge(scheduler::router())
}
