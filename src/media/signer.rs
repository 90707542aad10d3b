// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Token digests for the media delivery network.
//!
//! The delivery edge holds the same pre-shared secret and recomputes
//!
//! ```text
//! token = hex(SHA-256(secret || path || expires_at))
//! ```
//!
//! for every playback request, rejecting mismatches and expired links.
//! `expires_at` is the decimal Unix epoch in seconds.

use crate::config::MediaConfig;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Placeholder for the library id in [`MediaConfig::path_template`].
pub const LIBRARY_PLACEHOLDER: &str = "{library}";
/// Placeholder for the asset id in [`MediaConfig::path_template`].
pub const ASSET_PLACEHOLDER: &str = "{asset}";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("media signing secret is empty")]
    EmptySecret,
    #[error("path template must contain {{asset}}")]
    TemplateWithoutAsset,
}

pub struct TokenSigner {
    secret: Zeroizing<String>,
    path_template: String,
    library_id: String,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[redacted]")
            .field("path_template", &self.path_template)
            .field("library_id", &self.library_id)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(
        secret: &str,
        path_template: impl Into<String>,
        library_id: impl Into<String>,
    ) -> Result<Self, SignerError> {
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let path_template = path_template.into();
        if !path_template.contains(ASSET_PLACEHOLDER) {
            return Err(SignerError::TemplateWithoutAsset);
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_string()),
            path_template,
            library_id: library_id.into(),
        })
    }

    pub fn from_config(config: &MediaConfig) -> Result<Self, SignerError> {
        Self::new(
            &config.signing_secret,
            config.path_template.clone(),
            config.library_id.clone(),
        )
    }

    /// Addressable path of `asset` on the delivery network.
    ///
    /// Both ids are percent-encoded into a single path segment, so a stored
    /// asset id can never add segments or a query to the signed path.
    pub fn asset_path(&self, asset: &str) -> String {
        self.path_template
            .replace(LIBRARY_PLACEHOLDER, &urlencoding::encode(&self.library_id))
            .replace(ASSET_PLACEHOLDER, &urlencoding::encode(asset))
    }

    /// Hex digest binding `path` and `expires_at` to the shared secret.
    pub fn digest(&self, path: &str, expires_at: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(expires_at.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// The check the delivery edge performs. Not used on the playback path
    /// here; kept for operators and tests.
    pub fn verify(&self, path: &str, token: &str, expires_at: i64, now_epoch: i64) -> bool {
        if expires_at <= now_epoch {
            return false;
        }
        constant_time_eq(self.digest(path, expires_at).as_bytes(), token.as_bytes())
    }
}

/// Length-independent-time byte comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
