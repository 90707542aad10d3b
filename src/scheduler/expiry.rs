// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Privilege expiry: ACTIVE → GRACE → REVOKED.
//!
//! Every run is a single read-evaluate-write pass that fires at most one
//! transition. The deactivation and the role downgrade are separate writes,
//! so a failed downgrade leaves the persisted GRACE record in place and the
//! next run retries only the downgrade. Record writes are conditional on the
//! record this run read, so a renewal landing mid-run is never overwritten.

use super::{AuthorizationState, Clock, StandingAuthorization};
use crate::observability::EngineMetrics;
use crate::store::{AccountStore, AuthorizationStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler store access failed: {0}")]
    Store(#[from] StoreError),
}

/// Which transition a run fired, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Cold start: no record existed, a fresh ACTIVE one was written.
    Initialized,
    EnteredGrace,
    Revoked,
    /// Grace expired but the role downgrade write failed; retried next run.
    RevocationFailed,
    NoChange,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Initialized => "initialized",
            Transition::EnteredGrace => "entered_grace",
            Transition::Revoked => "revoked",
            Transition::RevocationFailed => "revocation_failed",
            Transition::NoChange => "no_change",
        }
    }
}

/// Status payload returned to the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    pub transition: Transition,
    pub state: AuthorizationState,
    pub role_demoted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchedulerReport {
    fn new(transition: Transition, state: AuthorizationState) -> Self {
        Self {
            transition,
            state,
            role_demoted: false,
            error: None,
        }
    }
}

pub struct PrivilegeExpiryScheduler {
    accounts: Arc<dyn AccountStore>,
    authorizations: Arc<dyn AuthorizationStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    subject_id: String,
    default_grace_days: u32,
}

impl PrivilegeExpiryScheduler {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        authorizations: Arc<dyn AuthorizationStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
        subject_id: impl Into<String>,
        default_grace_days: u32,
    ) -> Self {
        Self {
            accounts,
            authorizations,
            clock,
            metrics,
            subject_id: subject_id.into(),
            default_grace_days,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// One scheduler pass.
    pub async fn run_once(&self) -> Result<SchedulerReport, SchedulerError> {
        let now = self.clock.now();
        let report = match self.authorizations.load_authorization(&self.subject_id).await? {
            None => self.initialize(now).await?,
            Some(record) if record.active => self.check_renewal(record, now).await?,
            Some(record) => self.check_grace(record, now).await?,
        };
        self.metrics.transition(report.transition.as_str());
        Ok(report)
    }

    /// External renewal: * → ACTIVE. Creates the record if it is missing.
    pub async fn renew(&self) -> Result<StandingAuthorization, SchedulerError> {
        let now = self.clock.now();
        let mut record = self
            .authorizations
            .load_authorization(&self.subject_id)
            .await?
            .unwrap_or_else(|| {
                StandingAuthorization::new_active(&self.subject_id, now, self.default_grace_days)
            });
        record.renew(now);
        self.authorizations.save_authorization(&record).await?;
        info!(subject = %self.subject_id, "standing authorization renewed");
        Ok(record)
    }

    async fn initialize(&self, now: DateTime<Utc>) -> Result<SchedulerReport, SchedulerError> {
        let record =
            StandingAuthorization::new_active(&self.subject_id, now, self.default_grace_days);
        if !self.authorizations.replace_authorization(None, &record).await? {
            return self.superseded(now).await;
        }
        info!(
            subject = %self.subject_id,
            grace_days = self.default_grace_days,
            "no standing authorization found, created active record"
        );
        Ok(SchedulerReport::new(Transition::Initialized, AuthorizationState::Active))
    }

    /// The record changed between read and write. Report what is stored now
    /// and leave any transition to the next run.
    async fn superseded(&self, now: DateTime<Utc>) -> Result<SchedulerReport, SchedulerError> {
        warn!(subject = %self.subject_id, "standing authorization changed during run, skipping write");
        let current = self
            .authorizations
            .load_authorization(&self.subject_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "authorization",
                id: self.subject_id.clone(),
            })?;
        let role = self
            .accounts
            .get_account(&self.subject_id)
            .await?
            .map(|account| account.role);
        Ok(SchedulerReport::new(Transition::NoChange, current.state(role, now)))
    }

    async fn check_renewal(
        &self,
        mut record: StandingAuthorization,
        now: DateTime<Utc>,
    ) -> Result<SchedulerReport, SchedulerError> {
        if !record.renewal_overdue(now) {
            return Ok(SchedulerReport::new(Transition::NoChange, AuthorizationState::Active));
        }
        let observed = record.clone();
        record.deactivate(now);
        if !self
            .authorizations
            .replace_authorization(Some(&observed), &record)
            .await?
        {
            return self.superseded(now).await;
        }
        info!(
            subject = %self.subject_id,
            last_renewed = %record.last_renewed_at,
            "renewal overdue, standing authorization entered grace"
        );
        Ok(SchedulerReport::new(Transition::EnteredGrace, AuthorizationState::Grace))
    }

    async fn check_grace(
        &self,
        mut record: StandingAuthorization,
        now: DateTime<Utc>,
    ) -> Result<SchedulerReport, SchedulerError> {
        if record.deactivated_at.is_none() {
            let observed = record.clone();
            record.deactivated_at = Some(now);
            if !self
                .authorizations
                .replace_authorization(Some(&observed), &record)
                .await?
            {
                return self.superseded(now).await;
            }
            warn!(subject = %self.subject_id, "inactive record had no deactivation time, grace starts now");
            return Ok(SchedulerReport::new(Transition::EnteredGrace, AuthorizationState::Grace));
        }
        if !record.revocation_due(now) {
            return Ok(SchedulerReport::new(Transition::NoChange, AuthorizationState::Grace));
        }

        let Some(account) = self.accounts.get_account(&self.subject_id).await? else {
            warn!(subject = %self.subject_id, "grace expired but subject account does not exist");
            return Ok(SchedulerReport::new(Transition::NoChange, AuthorizationState::Revoked));
        };
        if !account.role.is_elevated() {
            return Ok(SchedulerReport::new(Transition::NoChange, AuthorizationState::Revoked));
        }
        let current = self.authorizations.load_authorization(&self.subject_id).await?;
        if current.as_ref() != Some(&record) {
            return self.superseded(now).await;
        }

        match self.accounts.set_role(&account.id, account.role.demoted()).await {
            Ok(changed) => {
                info!(subject = %account.id, changed, "grace expired, role downgraded");
                Ok(SchedulerReport {
                    role_demoted: changed,
                    ..SchedulerReport::new(Transition::Revoked, AuthorizationState::Revoked)
                })
            }
            Err(e) => {
                error!(subject = %account.id, error = %e, "role downgrade failed, will retry next run");
                Ok(SchedulerReport {
                    error: Some(e.to_string()),
                    ..SchedulerReport::new(Transition::RevocationFailed, AuthorizationState::Grace)
                })
            }
        }
    }
}
