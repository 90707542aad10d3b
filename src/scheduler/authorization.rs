// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Standing authorization record and its derived state.

use crate::identity::UserRole;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a standing authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationState {
    Active,
    /// Deactivated, still inside the grace window (or the demotion is pending).
    Grace,
    /// Deactivated, grace window over, dependent role already ordinary.
    Revoked,
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AuthorizationState::Active => "active",
            AuthorizationState::Grace => "grace",
            AuthorizationState::Revoked => "revoked",
        })
    }
}

/// Recurring authorization that keeps a subject's elevated role alive.
///
/// Exactly one record exists per subject. Only the scheduler and an explicit
/// renewal mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingAuthorization {
    pub subject_id: String,
    pub active: bool,
    pub last_renewed_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub grace_period_days: u32,
}

impl StandingAuthorization {
    /// Fresh record, renewed at `now`.
    pub fn new_active(subject_id: impl Into<String>, now: DateTime<Utc>, grace_period_days: u32) -> Self {
        Self {
            subject_id: subject_id.into(),
            active: true,
            last_renewed_at: now,
            deactivated_at: None,
            grace_period_days,
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::days(i64::from(self.grace_period_days))
    }

    /// Active record whose renewal is older than the grace period.
    pub fn renewal_overdue(&self, now: DateTime<Utc>) -> bool {
        self.active && now > self.last_renewed_at + self.grace_period()
    }

    /// Inactive record whose grace window has run out.
    ///
    /// An inactive record without a deactivation timestamp is never due; the
    /// scheduler stamps it first so the full grace window still applies.
    pub fn revocation_due(&self, now: DateTime<Utc>) -> bool {
        !self.active
            && self
                .deactivated_at
                .is_some_and(|at| now >= at + self.grace_period())
    }

    /// ACTIVE → GRACE.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.deactivated_at = Some(now);
    }

    /// * → ACTIVE. The external renewal trigger.
    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.active = true;
        self.last_renewed_at = now;
        self.deactivated_at = None;
    }

    /// State given the dependent subject's current role.
    pub fn state(&self, subject_role: Option<UserRole>, now: DateTime<Utc>) -> AuthorizationState {
        if self.active {
            return AuthorizationState::Active;
        }
        let still_elevated = subject_role.is_some_and(UserRole::is_elevated);
        if self.revocation_due(now) && !still_elevated {
            AuthorizationState::Revoked
        } else {
            AuthorizationState::Grace
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(now: DateTime<Utc>) -> StandingAuthorization {
        StandingAuthorization::new_active("dev", now, 7)
    }

    #[test]
    fn renewal_becomes_overdue_strictly_after_grace() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.last_renewed_at = now - Duration::days(7);
        assert!(!rec.renewal_overdue(now));
        assert!(rec.renewal_overdue(now + Duration::seconds(1)));
    }

    #[test]
    fn revocation_due_at_end_of_grace() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.deactivate(now - Duration::days(7));
        assert!(rec.revocation_due(now));
        assert!(!rec.revocation_due(now - Duration::seconds(1)));
    }

    #[test]
    fn inactive_without_timestamp_is_not_due() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.active = false;
        assert!(!rec.revocation_due(now + Duration::days(365)));
    }

    #[test]
    fn renew_resets_everything() {
        let now = Utc::now();
        let mut rec = record(now - Duration::days(40));
        rec.deactivate(now - Duration::days(20));
        rec.renew(now);
        assert!(rec.active);
        assert_eq!(rec.last_renewed_at, now);
        assert!(rec.deactivated_at.is_none());
        assert_eq!(rec.state(Some(UserRole::Administrator), now), AuthorizationState::Active);
    }

    #[test]
    fn state_depends_on_role_after_grace() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.deactivate(now - Duration::days(8));
        assert_eq!(rec.state(Some(UserRole::Administrator), now), AuthorizationState::Grace);
        assert_eq!(rec.state(Some(UserRole::Ordinary), now), AuthorizationState::Revoked);
        assert_eq!(rec.state(None, now), AuthorizationState::Revoked);

        rec.deactivate(now - Duration::days(1));
        assert_eq!(rec.state(Some(UserRole::Ordinary), now), AuthorizationState::Grace);
    }
}
