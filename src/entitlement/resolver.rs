// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Entitlement resolution.
//!
//! Maps an account snapshot to the tier it is currently entitled to.
//!
//! Resolution order:
//! 1. **Administrative override**: administrators are always `Elite`
//! 2. **License lookup**: stored value through the alias table, unknown → `None`
//! 3. **Temporal check** (when enabled): an expiry strictly in the past → `None`
//!
//! Resolution is total and pure. Bad input degrades to `None`, it never errors.

use crate::config::EntitlementConfig;
use crate::entitlement::LicenseAliasTable;
use crate::identity::{Tier, UserAccount};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which rule produced a resolved tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    AdminOverride,
    License,
    /// Stored value was missing, empty, or not in the alias table.
    Unrecognized,
    Expired,
}

/// Resolved tier plus the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub tier: Tier,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    aliases: LicenseAliasTable,
    enforce_expiry: bool,
}

impl EntitlementResolver {
    pub fn new(aliases: LicenseAliasTable, enforce_expiry: bool) -> Self {
        Self {
            aliases,
            enforce_expiry,
        }
    }

    pub fn from_config(config: &EntitlementConfig) -> Self {
        Self::new(
            LicenseAliasTable::with_overrides(&config.legacy_aliases),
            config.enforce_expiry,
        )
    }

    pub fn enforces_expiry(&self) -> bool {
        self.enforce_expiry
    }

    /// Effective tier of `account` at `now`.
    pub fn resolve(&self, account: &UserAccount, now: DateTime<Utc>) -> Tier {
        self.resolve_detailed(account, now).tier
    }

    pub fn resolve_detailed(&self, account: &UserAccount, now: DateTime<Utc>) -> Resolution {
        if account.role.is_elevated() {
            return Resolution {
                tier: Tier::Elite,
                source: ResolutionSource::AdminOverride,
            };
        }

        let tier = self.aliases.lookup(account.license.as_deref());
        if tier == Tier::None {
            let explicit_none = account
                .license
                .as_deref()
                .is_some_and(|raw| self.aliases.recognizes(raw));
            if !explicit_none {
                if let Some(raw) = account.license.as_deref().filter(|r| !r.trim().is_empty()) {
                    tracing::debug!(
                        account = %account.id,
                        license = raw,
                        "unrecognized license value, resolving to none"
                    );
                }
            }
            return Resolution {
                tier: Tier::None,
                source: if explicit_none {
                    ResolutionSource::License
                } else {
                    ResolutionSource::Unrecognized
                },
            };
        }

        if self.enforce_expiry && account.license_expired_at(now) {
            return Resolution {
                tier: Tier::None,
                source: ResolutionSource::Expired,
            };
        }

        Resolution {
            tier,
            source: ResolutionSource::License,
        }
    }
}

impl Default for EntitlementResolver {
    fn default() -> Self {
        Self::new(LicenseAliasTable::builtin(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserRole;
    use chrono::Duration;

    fn resolver() -> EntitlementResolver {
        EntitlementResolver::default()
    }

    #[test]
    fn administrator_is_always_elite() {
        let now = Utc::now();
        for license in [None, Some("none"), Some("basic"), Some("garbage"), Some("")] {
            let mut account = UserAccount::administrator("admin");
            account.license = license.map(str::to_string);
            account.license_valid_until = Some(now - Duration::days(30));
            let resolution = resolver().resolve_detailed(&account, now);
            assert_eq!(resolution.tier, Tier::Elite);
            assert_eq!(resolution.source, ResolutionSource::AdminOverride);
        }
    }

    #[test]
    fn resolve_is_total() {
        let now = Utc::now();
        let inputs = [
            None,
            Some(""),
            Some("   "),
            Some("none"),
            Some("NONE"),
            Some("unknown-alias"),
            Some("\u{0}"),
            Some("élite"),
        ];
        for license in inputs {
            let account = UserAccount::member("u", license);
            assert_eq!(resolver().resolve(&account, now), Tier::None, "{license:?}");
        }
    }

    #[test]
    fn legacy_alias_resolves_to_current_tier() {
        let now = Utc::now();
        assert_eq!(
            resolver().resolve(&UserAccount::member("u", Some("premium")), now),
            Tier::Pro
        );
        assert_eq!(
            resolver().resolve(&UserAccount::member("u", Some("vip")), now),
            Tier::Elite
        );
    }

    #[test]
    fn expired_license_collapses_to_none() {
        let now = Utc::now();
        let account =
            UserAccount::member("u", Some("elite")).with_expiry(now - Duration::seconds(1));
        let resolution = resolver().resolve_detailed(&account, now);
        assert_eq!(resolution.tier, Tier::None);
        assert_eq!(resolution.source, ResolutionSource::Expired);
    }

    #[test]
    fn expiry_exactly_now_is_still_valid() {
        let now = Utc::now();
        let account = UserAccount::member("u", Some("pro")).with_expiry(now);
        assert_eq!(resolver().resolve(&account, now), Tier::Pro);
    }

    #[test]
    fn expiry_check_can_be_disabled() {
        let now = Utc::now();
        let lenient = EntitlementResolver::new(LicenseAliasTable::builtin(), false);
        let account =
            UserAccount::member("u", Some("starter")).with_expiry(now - Duration::days(1));
        assert!(!lenient.enforces_expiry());
        assert_eq!(lenient.resolve(&account, now), Tier::Starter);
    }

    #[test]
    fn unrecognized_value_is_reported_as_such() {
        let account = UserAccount::member("u", Some("gold"));
        let resolution = resolver().resolve_detailed(&account, Utc::now());
        assert_eq!(resolution.source, ResolutionSource::Unrecognized);
        assert_eq!(account.role, UserRole::Ordinary);
    }

    #[test]
    fn config_aliases_are_honoured() {
        let mut config = EntitlementConfig::default();
        config
            .legacy_aliases
            .insert("lifetime".to_string(), Tier::Elite);
        let resolver = EntitlementResolver::from_config(&config);
        let account = UserAccount::member("u", Some("Lifetime"));
        assert_eq!(resolver.resolve(&account, Utc::now()), Tier::Elite);
    }
}
