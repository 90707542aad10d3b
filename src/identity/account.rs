// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::identity::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of an account as handed to the engine.
///
/// `license` is the raw stored value: a current tier name, a legacy alias,
/// an explicit "none", or anything else an old import left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub license_valid_until: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Ordinary account with the given stored license value.
    pub fn member(id: impl Into<String>, license: Option<&str>) -> Self {
        Self {
            id: id.into(),
            role: UserRole::Ordinary,
            license: license.map(str::to_string),
            license_valid_until: None,
        }
    }

    /// Administrator account with no stored license.
    pub fn administrator(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: UserRole::Administrator,
            license: None,
            license_valid_until: None,
        }
    }

    pub fn with_expiry(mut self, valid_until: DateTime<Utc>) -> Self {
        self.license_valid_until = Some(valid_until);
        self
    }

    /// True when the account carries an expiry strictly before `now`.
    pub fn license_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.license_valid_until.is_some_and(|until| until < now)
    }
}
