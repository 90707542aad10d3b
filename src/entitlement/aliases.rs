// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Stored license value → tier lookup table.
//!
//! Accounts imported from earlier billing setups carry license names that
//! predate the current tiers. The mapping is plain data so new aliases can be
//! added from config without touching resolver logic.

use crate::identity::Tier;
use std::collections::HashMap;

/// Legacy aliases shipped with the engine, mapped 1:1 onto paid tiers.
pub const LEGACY_ALIASES: [(&str, Tier); 3] = [
    ("basic", Tier::Starter),
    ("premium", Tier::Pro),
    ("vip", Tier::Elite),
];

/// Case-insensitive alias table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseAliasTable {
    entries: HashMap<String, Tier>,
}

impl LicenseAliasTable {
    /// Canonical tier names, the explicit "none" value and [`LEGACY_ALIASES`].
    pub fn builtin() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
        };
        for tier in Tier::ALL {
            table.insert(tier.as_str(), tier);
        }
        for (alias, tier) in LEGACY_ALIASES {
            table.insert(alias, tier);
        }
        table
    }

    /// Built-in table with `overrides` merged on top.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Tier)>,
    {
        let mut table = Self::builtin();
        for (alias, tier) in overrides {
            table.insert(alias, *tier);
        }
        table
    }

    pub fn insert(&mut self, alias: &str, tier: Tier) {
        self.entries.insert(normalize(alias), tier);
    }

    /// Look up a stored value. Missing, empty and unrecognized values are `None`.
    pub fn lookup(&self, stored: Option<&str>) -> Tier {
        let Some(raw) = stored else {
            return Tier::None;
        };
        let key = normalize(raw);
        if key.is_empty() {
            return Tier::None;
        }
        self.entries.get(&key).copied().unwrap_or(Tier::None)
    }

    /// Whether the value is a key of the table, even one mapping to `none`.
    pub fn recognizes(&self, stored: &str) -> bool {
        self.entries.contains_key(&normalize(stored))
    }
}

impl Default for LicenseAliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
