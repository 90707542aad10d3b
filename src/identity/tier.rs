// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! License tiers and their ordering.
//!
//! A tier is the access level an account is entitled to. Tiers are totally
//! ordered `None < Starter < Pro < Elite`; content declares the minimum tier
//! it requires and [`meets`] decides whether an entitlement covers it.

use serde::{Deserialize, Serialize};

/// Ordered license tier.
///
/// `None` is the closed default: it only satisfies content that requires no
/// tier at all.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    None,
    Starter,
    Pro,
    Elite,
}

impl Tier {
    /// Every tier, lowest first.
    pub const ALL: [Tier; 4] = [Tier::None, Tier::Starter, Tier::Pro, Tier::Elite];

    /// Numeric rank, monotonic with the declaration order.
    pub const fn rank(self) -> u8 {
        match self {
            Tier::None => 0,
            Tier::Starter => 1,
            Tier::Pro => 2,
            Tier::Elite => 3,
        }
    }

    /// Whether an account holding `self` may reach content requiring `required`.
    pub fn meets(self, required: Tier) -> bool {
        meets(self, required)
    }

    /// Canonical lowercase name, as stored and serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Elite => "elite",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a canonical tier name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier '{0}'")]
pub struct UnknownTier(pub String);

/// Strict parse of canonical tier names only.
///
/// Stored license values go through the alias table in
/// [`crate::entitlement`] instead, which never fails.
impl std::str::FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Rank of a tier; see [`Tier::rank`].
pub const fn rank(tier: Tier) -> u8 {
    tier.rank()
}

/// `required == None`, or a real tier ranked at least as high as `required`.
pub fn meets(user: Tier, required: Tier) -> bool {
    required == Tier::None || (user != Tier::None && rank(user) >= rank(required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_follows_declaration_order() {
        let ranks: Vec<u8> = Tier::ALL.iter().map(|t| t.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(Tier::None < Tier::Starter);
        assert!(Tier::Starter < Tier::Pro);
        assert!(Tier::Pro < Tier::Elite);
    }

    #[test]
    fn every_tier_meets_none() {
        for tier in Tier::ALL {
            assert!(meets(tier, Tier::None), "{tier} should meet none");
        }
    }

    #[test]
    fn none_meets_nothing_but_none() {
        for tier in Tier::ALL {
            assert_eq!(meets(Tier::None, tier), tier == Tier::None);
        }
    }

    #[test]
    fn meets_is_rank_comparison_for_real_tiers() {
        for user in &Tier::ALL[1..] {
            for required in &Tier::ALL[1..] {
                assert_eq!(user.meets(*required), user.rank() >= required.rank());
            }
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_strict() {
        assert_eq!("ELITE".parse::<Tier>().unwrap(), Tier::Elite);
        assert_eq!(" pro ".parse::<Tier>().unwrap(), Tier::Pro);
        assert!("vip".parse::<Tier>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Tier::Starter).unwrap(), "\"starter\"");
        let tier: Tier = serde_json::from_str("\"elite\"").unwrap();
        assert_eq!(tier, Tier::Elite);
    }
}
