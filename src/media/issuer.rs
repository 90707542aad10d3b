// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Signed media token issuance.
//!
//! This is the only place playback tokens are minted. The decision order is:
//!
//! 1. **Open preview**: no entitlement checks at all
//! 2. **Resource state**: a missing or inactive owning resource is forbidden,
//!    administrators included
//! 3. **Tier**: the caller's effective tier must meet the resource's
//!    required tier
//!
//! Then the expiry is fixed as `now + ttl` (ttl clamped to `1s..=max_ttl`)
//! and the digest computed. Tokens are not tracked; two requests yield two
//! independent tokens.

use crate::catalog::{MediaItem, Resource};
use crate::config::MediaConfig;
use crate::entitlement::EntitlementResolver;
use crate::identity::{Tier, UserAccount};
use crate::media::{SignedMediaToken, SignerError, TokenSigner};
use crate::observability::EngineMetrics;
use crate::scheduler::Clock;
use crate::store::{AccountStore, CatalogStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForbiddenReason {
    ResourceInactive,
    /// The owning resource could not be found.
    ResourceUnavailable,
    InsufficientTier { effective: Tier, required: Tier },
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForbiddenReason::ResourceInactive => f.write_str("resource is inactive"),
            ForbiddenReason::ResourceUnavailable => f.write_str("resource is unavailable"),
            ForbiddenReason::InsufficientTier { effective, required } => {
                write!(f, "tier {effective} does not meet required {required}")
            }
        }
    }
}

/// Non-retryable refusal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("forbidden: media '{media_id}': {reason}")]
pub struct AccessDenied {
    pub media_id: String,
    pub reason: ForbiddenReason,
}

/// How a successful request was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    OpenPreview,
    Entitled(Tier),
}

pub struct MediaTokenIssuer {
    resolver: Arc<EntitlementResolver>,
    signer: TokenSigner,
    default_ttl: Duration,
    max_ttl: Duration,
}

impl MediaTokenIssuer {
    pub fn new(
        resolver: Arc<EntitlementResolver>,
        signer: TokenSigner,
        default_ttl: Duration,
        max_ttl: Duration,
    ) -> Self {
        let max_ttl = max_ttl.max(Duration::from_secs(1));
        Self {
            resolver,
            signer,
            default_ttl: default_ttl.min(max_ttl),
            max_ttl,
        }
    }

    pub fn from_config(
        resolver: Arc<EntitlementResolver>,
        config: &MediaConfig,
    ) -> Result<Self, SignerError> {
        Ok(Self::new(
            resolver,
            TokenSigner::from_config(config)?,
            Duration::from_secs(config.default_ttl_secs),
            Duration::from_secs(config.max_ttl_secs),
        ))
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Requested ttl, defaulted and clamped to `1s..=max_ttl`.
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        requested
            .unwrap_or(self.default_ttl)
            .clamp(Duration::from_secs(1), self.max_ttl)
    }

    /// Entitlement decision without minting anything.
    pub fn authorize(
        &self,
        caller: &UserAccount,
        item: &MediaItem,
        owner: Option<&Resource>,
        now: DateTime<Utc>,
    ) -> Result<Admission, AccessDenied> {
        if item.open_preview {
            return Ok(Admission::OpenPreview);
        }

        let deny = |reason| AccessDenied {
            media_id: item.id.clone(),
            reason,
        };

        let resource = owner
            .filter(|r| r.id == item.resource_id)
            .ok_or_else(|| deny(ForbiddenReason::ResourceUnavailable))?;
        if !resource.is_active {
            return Err(deny(ForbiddenReason::ResourceInactive));
        }

        let effective = self.resolver.resolve(caller, now);
        let required = resource.effective_required_tier();
        if !effective.meets(required) {
            return Err(deny(ForbiddenReason::InsufficientTier { effective, required }));
        }
        Ok(Admission::Entitled(effective))
    }

    /// Authorize and mint a token for `item`.
    pub fn issue(
        &self,
        caller: &UserAccount,
        item: &MediaItem,
        owner: Option<&Resource>,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<SignedMediaToken, AccessDenied> {
        self.authorize(caller, item, owner, now)?;
        Ok(self.mint(item, ttl, now))
    }

    fn mint(&self, item: &MediaItem, ttl: Option<Duration>, now: DateTime<Utc>) -> SignedMediaToken {
        let ttl_secs = i64::try_from(self.effective_ttl(ttl).as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp().saturating_add(ttl_secs);
        let path = self.signer.asset_path(&item.video_asset);
        let token = self.signer.digest(&path, expires_at);
        SignedMediaToken {
            path,
            token,
            expires_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaAccessError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("account '{0}' not found")]
    UnknownAccount(String),
    #[error("media item '{0}' not found")]
    UnknownMedia(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MediaAccessError {
    /// Only store failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MediaAccessError::Store(_))
    }
}

/// Store-backed issuance: loads caller, media item and owning resource.
pub struct MediaTokenService {
    accounts: Arc<dyn AccountStore>,
    catalog: Arc<dyn CatalogStore>,
    issuer: Arc<MediaTokenIssuer>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    base_url: String,
}

impl MediaTokenService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        catalog: Arc<dyn CatalogStore>,
        issuer: Arc<MediaTokenIssuer>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            catalog,
            issuer,
            clock,
            metrics,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn issuer(&self) -> &MediaTokenIssuer {
        &self.issuer
    }

    /// Issue a token for `media_id` on behalf of `user_id`.
    ///
    /// An absent caller is treated as an account without a license, so it
    /// can only reach open previews. Previews never load the caller or the
    /// owning resource, so an unknown `user_id` still gets one.
    pub async fn issue_for_media(
        &self,
        user_id: Option<&str>,
        media_id: &str,
        ttl: Option<Duration>,
    ) -> Result<SignedMediaToken, MediaAccessError> {
        let item = self
            .catalog
            .get_media_item(media_id)
            .await?
            .ok_or_else(|| MediaAccessError::UnknownMedia(media_id.to_string()))?;

        let (caller, owner) = if item.open_preview {
            (UserAccount::member(user_id.unwrap_or("anonymous"), None), None)
        } else {
            let caller = match user_id {
                Some(id) => self
                    .accounts
                    .get_account(id)
                    .await?
                    .ok_or_else(|| MediaAccessError::UnknownAccount(id.to_string()))?,
                None => UserAccount::member("anonymous", None),
            };
            (caller, self.catalog.get_resource(&item.resource_id).await?)
        };

        let now = self.clock.now();
        match self.issuer.issue(&caller, &item, owner.as_ref(), ttl, now) {
            Ok(token) => {
                let outcome = if item.open_preview { "preview" } else { "issued" };
                self.metrics.token_outcome(outcome);
                tracing::debug!(
                    user = %caller.id,
                    media = %item.id,
                    expires_at = token.expires_at,
                    "media token issued"
                );
                Ok(token)
            }
            Err(denied) => {
                self.metrics.token_outcome("forbidden");
                tracing::warn!(user = %caller.id, media = %item.id, reason = %denied.reason, "media token denied");
                Err(denied.into())
            }
        }
    }
}
