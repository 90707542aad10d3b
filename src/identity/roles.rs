// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Account roles.
//!
//! The role is orthogonal to the license tier: administrators are granted
//! the highest tier by the resolver regardless of what they paid for, and
//! the privilege expiry scheduler is the only component that changes a
//! role (demoting an administrator back to an ordinary account).

use serde::{Deserialize, Serialize};

/// Role stored on an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular member: access is governed by the license tier.
    #[default]
    Ordinary,
    /// Administrative override: resolves to the top tier.
    Administrator,
}

impl UserRole {
    /// Whether this role carries elevated privileges that can lapse.
    pub const fn is_elevated(self) -> bool {
        matches!(self, UserRole::Administrator)
    }

    /// The role an elevated account falls back to when its authorization lapses.
    pub const fn demoted(self) -> UserRole {
        UserRole::Ordinary
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            UserRole::Ordinary => "ordinary",
            UserRole::Administrator => "administrator",
        }
    }

    /// Parse a stored role column.
    ///
    /// Unknown values map to `Ordinary` so that a corrupted role can never
    /// widen access.
    pub fn from_stored(raw: &str) -> UserRole {
        match raw.trim().to_ascii_lowercase().as_str() {
            "administrator" | "admin" => UserRole::Administrator,
            _ => UserRole::Ordinary,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_outranks_ordinary() {
        assert!(UserRole::Ordinary < UserRole::Administrator);
    }

    #[test]
    fn only_administrator_is_elevated() {
        assert!(UserRole::Administrator.is_elevated());
        assert!(!UserRole::Ordinary.is_elevated());
        assert_eq!(UserRole::Administrator.demoted(), UserRole::Ordinary);
    }

    #[test]
    fn default_is_ordinary() {
        assert_eq!(UserRole::default(), UserRole::Ordinary);
    }

    #[test]
    fn unknown_stored_role_is_ordinary() {
        assert_eq!(UserRole::from_stored("admin"), UserRole::Administrator);
        assert_eq!(UserRole::from_stored(" Administrator "), UserRole::Administrator);
        assert_eq!(UserRole::from_stored("superuser"), UserRole::Ordinary);
        assert_eq!(UserRole::from_stored(""), UserRole::Ordinary);
    }

    #[test]
    fn role_display_formatting() {
        assert_eq!(format!("{}", UserRole::Administrator), "administrator");
        assert_eq!(format!("{}", UserRole::Ordinary), "ordinary");
    }

    #[test]
    fn role_serde_roundtrip() {
        let json = serde_json::to_string(&UserRole::Administrator).unwrap();
        assert_eq!(json, "\"administrator\"");
        let role: UserRole = serde_json::from_str(&json).unwrap();
        assert_eq!(role, UserRole::Administrator);
    }
}
