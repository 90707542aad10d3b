// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod aliases;
pub mod resolver;

pub use aliases::{LicenseAliasTable, LEGACY_ALIASES};
pub use resolver::{EntitlementResolver, Resolution, ResolutionSource};
