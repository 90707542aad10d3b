// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod reconciler;

pub use reconciler::{reconcile, GrantReconciler, ReconcileError, ReconcileReport, ResourceFailure};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a grant exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    /// Written by reconciliation from the account's license tier.
    License,
    /// Written by an operator or a purchase flow outside the engine.
    Manual,
}

impl GrantKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            GrantKind::License => "license",
            GrantKind::Manual => "manual",
        }
    }

    pub fn from_stored(raw: &str) -> Option<GrantKind> {
        match raw {
            "license" => Some(GrantKind::License),
            "manual" => Some(GrantKind::Manual),
            _ => None,
        }
    }
}

/// Persisted permission for one account to reach one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub user_id: String,
    pub resource_id: String,
    pub kind: GrantKind,
    pub granted_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn license(
        user_id: impl Into<String>,
        resource_id: impl Into<String>,
        granted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            kind: GrantKind::License,
            granted_at,
        }
    }
}
