//! Integration tests for the tier model and role policy.
//! Tests ordering, the meets() contract and deny-by-default resolution.

use chrono::{Duration, Utc};
use coursegate_core::entitlement::EntitlementResolver;
use coursegate_core::{meets, rank, Tier, UserAccount, UserRole};

/// Verify None < Starter < Pro < Elite
#[test]
fn test_tier_ordering() {
    assert!(Tier::None < Tier::Starter);
    assert!(Tier::Starter < Tier::Pro);
    assert!(Tier::Pro < Tier::Elite);
    assert!(rank(Tier::None) < rank(Tier::Elite));
}

/// meets() over the whole domain
#[test]
fn test_meets_matrix() {
    for user in Tier::ALL {
        assert!(meets(user, Tier::None), "{user} must meet None");
        for required in [Tier::Starter, Tier::Pro, Tier::Elite] {
            let expected = user != Tier::None && rank(user) >= rank(required);
            assert_eq!(meets(user, required), expected, "{user} vs {required}");
        }
    }
}

/// Verify UserRole default is Ordinary
#[test]
fn test_user_role_default() {
    assert_eq!(UserRole::default(), UserRole::Ordinary);
    assert!(UserRole::Ordinary < UserRole::Administrator);
}

/// Administrators resolve to Elite whatever their license says
#[test]
fn test_admin_override() {
    let resolver = EntitlementResolver::default();
    let now = Utc::now();
    let mut admin = UserAccount::administrator("root");
    admin.license = Some("garbage".into());
    admin.license_valid_until = Some(now - Duration::days(10));
    assert_eq!(resolver.resolve(&admin, now), Tier::Elite);
}

/// Unknown, empty and missing licenses never open anything
#[test]
fn test_deny_by_default() {
    let resolver = EntitlementResolver::default();
    let now = Utc::now();
    for license in [None, Some(""), Some("none"), Some("NONE"), Some("platinum"), Some("  ")] {
        let account = UserAccount::member("u", license);
        assert_eq!(resolver.resolve(&account, now), Tier::None, "{license:?}");
    }
}

/// Legacy aliases map onto current tiers, case-insensitively
#[test]
fn test_legacy_aliases() {
    let resolver = EntitlementResolver::default();
    let now = Utc::now();
    for (license, tier) in [
        ("basic", Tier::Starter),
        ("Premium", Tier::Pro),
        ("VIP", Tier::Elite),
        ("starter", Tier::Starter),
        ("pro", Tier::Pro),
        ("elite", Tier::Elite),
    ] {
        let account = UserAccount::member("u", Some(license));
        assert_eq!(resolver.resolve(&account, now), tier, "{license}");
    }
}

/// An expired license collapses to None when expiry is enforced
#[test]
fn test_expired_license_collapses() {
    let resolver = EntitlementResolver::default();
    let now = Utc::now();
    let expired = UserAccount::member("u", Some("vip")).with_expiry(now - Duration::seconds(1));
    let current = UserAccount::member("u", Some("vip")).with_expiry(now + Duration::days(1));
    assert_eq!(resolver.resolve(&expired, now), Tier::None);
    assert_eq!(resolver.resolve(&current, now), Tier::Elite);
}
