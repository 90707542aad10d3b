// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use serde::{Deserialize, Serialize};

/// Ephemeral, non-persisted playback credential.
///
/// The caller forwards it verbatim to the delivery network, which recomputes
/// `token` from `path` and `expires_at` with its own copy of the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMediaToken {
    pub path: String,
    pub token: String,
    /// Unix epoch seconds; always later than the issuance instant.
    pub expires_at: i64,
}

impl SignedMediaToken {
    /// `base_url + path` with the token and expiry as query parameters.
    pub fn playback_url(&self, base_url: &str) -> String {
        format!(
            "{}{}?token={}&expires={}",
            base_url.trim_end_matches('/'),
            self.path,
            self.token,
            self.expires_at
        )
    }
}
