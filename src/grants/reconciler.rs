// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Additive grant reconciliation.
//!
//! Brings the persisted grants of one account up to what its resolved tier
//! entitles it to:
//!
//! 1. Resolve the effective tier (`None` short-circuits to an empty report)
//! 2. Keep the active candidates whose required tier the account meets
//! 3. Load the account's existing grants
//! 4. Upsert one grant per entitled resource that has none
//!
//! Grants are never removed here, even when the tier has since dropped.
//! Each write is independent: one failing resource is reported and the rest
//! still go through.

use crate::catalog::Resource;
use crate::entitlement::EntitlementResolver;
use crate::grants::AccessGrant;
use crate::identity::{Tier, UserAccount};
use crate::observability::EngineMetrics;
use crate::scheduler::Clock;
use crate::store::{AccountStore, CatalogStore, GrantStore, StoreError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

/// A resource whose grant could not be written.
#[derive(Debug, Serialize)]
pub struct ResourceFailure {
    pub resource_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: StoreError,
}

fn serialize_display<S: Serializer>(error: &StoreError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub user_id: String,
    pub tier: Tier,
    /// Grants written by this pass.
    pub granted: Vec<String>,
    /// Entitled resources that already had a grant.
    pub already_present: Vec<String>,
    pub errors: Vec<ResourceFailure>,
}

impl ReconcileReport {
    fn empty(user_id: &str, tier: Tier) -> Self {
        Self {
            user_id: user_id.to_string(),
            tier,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("account '{0}' not found")]
    UnknownAccount(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reconcile `account` against `candidates`.
///
/// Only a failure to read the existing grants aborts the pass; write
/// failures end up in [`ReconcileReport::errors`].
pub async fn reconcile<G>(
    resolver: &EntitlementResolver,
    grants: &G,
    account: &UserAccount,
    candidates: &[Resource],
    now: DateTime<Utc>,
) -> Result<ReconcileReport, StoreError>
where
    G: GrantStore + ?Sized,
{
    let tier = resolver.resolve(account, now);
    let mut report = ReconcileReport::empty(&account.id, tier);
    if tier == Tier::None {
        return Ok(report);
    }

    let entitled: Vec<&Resource> = candidates
        .iter()
        .filter(|r| r.is_active && tier.meets(r.effective_required_tier()))
        .collect();
    if entitled.is_empty() {
        return Ok(report);
    }

    let existing: HashSet<String> = grants
        .grants_for_user(&account.id)
        .await?
        .into_iter()
        .map(|g| g.resource_id)
        .collect();

    let mut missing = Vec::new();
    for resource in entitled {
        if existing.contains(&resource.id) {
            report.already_present.push(resource.id.clone());
        } else if !missing.contains(&resource.id) {
            missing.push(resource.id.clone());
        }
    }

    let writes = missing.into_iter().map(|resource_id| async move {
        let grant = AccessGrant::license(account.id.clone(), resource_id.clone(), now);
        let outcome = grants.upsert_grant(&grant).await;
        (resource_id, outcome)
    });

    for (resource_id, outcome) in join_all(writes).await {
        match outcome {
            Ok(true) => {
                tracing::info!(user = %account.id, resource = %resource_id, %tier, "grant written");
                report.granted.push(resource_id);
            }
            // Lost a race with a concurrent pass; the row is there.
            Ok(false) => report.already_present.push(resource_id),
            Err(error) => {
                tracing::error!(user = %account.id, resource = %resource_id, "grant write failed: {error}");
                report.errors.push(ResourceFailure { resource_id, error });
            }
        }
    }

    Ok(report)
}

/// Store-backed reconciliation service.
pub struct GrantReconciler {
    accounts: Arc<dyn AccountStore>,
    catalog: Arc<dyn CatalogStore>,
    grants: Arc<dyn GrantStore>,
    resolver: Arc<EntitlementResolver>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
}

impl GrantReconciler {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        catalog: Arc<dyn CatalogStore>,
        grants: Arc<dyn GrantStore>,
        resolver: Arc<EntitlementResolver>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            accounts,
            catalog,
            grants,
            resolver,
            clock,
            metrics,
        }
    }

    /// Load `user_id` and reconcile it against every active resource.
    pub async fn reconcile_user(&self, user_id: &str) -> Result<ReconcileReport, ReconcileError> {
        let account = self
            .accounts
            .get_account(user_id)
            .await?
            .ok_or_else(|| ReconcileError::UnknownAccount(user_id.to_string()))?;
        self.reconcile_account(&account).await
    }

    pub async fn reconcile_account(
        &self,
        account: &UserAccount,
    ) -> Result<ReconcileReport, ReconcileError> {
        let now = self.clock.now();
        // Tier `None` never needs the catalog.
        if self.resolver.resolve(account, now) == Tier::None {
            tracing::debug!(user = %account.id, "no entitlement, nothing to reconcile");
            return Ok(ReconcileReport::empty(&account.id, Tier::None));
        }

        let candidates = self.catalog.active_resources().await?;
        let report = reconcile(
            &self.resolver,
            self.grants.as_ref(),
            account,
            &candidates,
            now,
        )
        .await?;

        self.metrics.grants_written(report.granted.len());
        self.metrics.grant_failures(report.errors.len());
        tracing::info!(
            user = %account.id,
            tier = %report.tier,
            granted = report.granted.len(),
            already_present = report.already_present.len(),
            failed = report.errors.len(),
            "reconciliation finished"
        );
        Ok(report)
    }
}
