// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod schema;

pub use schema::{
    Config, EntitlementConfig, GatewayConfig, MediaConfig, ObservabilityConfig, SchedulerConfig,
    StoreConfig, SERVICE_SECRET_ENV, SIGNING_SECRET_ENV, TRIGGER_SECRET_ENV,
};
