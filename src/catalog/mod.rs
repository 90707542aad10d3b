// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Content catalog records the engine reads.
//!
//! A [`Resource`] (course module) is the unit access is granted on; a
//! [`MediaItem`] (lesson video) belongs to exactly one resource and is only
//! gated through it, unless it is an open preview.

use crate::identity::Tier;
use serde::{Deserialize, Serialize};

/// Tier assumed for resources that declare none.
pub const DEFAULT_REQUIRED_TIER: Tier = Tier::Starter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    /// `None` means "not configured", which is gated as [`DEFAULT_REQUIRED_TIER`].
    #[serde(default)]
    pub required_tier: Option<Tier>,
    pub is_active: bool,
}

impl Resource {
    pub fn new(id: impl Into<String>, required_tier: Option<Tier>) -> Self {
        Self {
            id: id.into(),
            required_tier,
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Required tier with the safety default applied.
    pub fn effective_required_tier(&self) -> Tier {
        self.required_tier.unwrap_or(DEFAULT_REQUIRED_TIER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub resource_id: String,
    /// Identifier of the video asset on the delivery network.
    pub video_asset: String,
    /// Open previews bypass entitlement checks entirely.
    #[serde(default)]
    pub open_preview: bool,
}

impl MediaItem {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        video_asset: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            video_asset: video_asset.into(),
            open_preview: false,
        }
    }

    pub fn preview(mut self) -> Self {
        self.open_preview = true;
        self
    }
}
