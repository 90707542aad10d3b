// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Wiring: one store, one clock, one metrics registry, every service.

use crate::config::Config;
use crate::entitlement::EntitlementResolver;
use crate::grants::GrantReconciler;
use crate::media::{MediaTokenIssuer, MediaTokenService};
use crate::observability::EngineMetrics;
use crate::scheduler::{Clock, PrivilegeExpiryScheduler};
use crate::store::EngineStore;
use anyhow::{Context, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct Engine {
    pub resolver: Arc<EntitlementResolver>,
    pub reconciler: Arc<GrantReconciler>,
    pub tokens: Arc<MediaTokenService>,
    pub scheduler: Arc<PrivilegeExpiryScheduler>,
    pub metrics: Arc<EngineMetrics>,
}

impl Engine {
    pub fn build<S>(config: &Config, store: Arc<S>, clock: Arc<dyn Clock>) -> Result<Self>
    where
        S: EngineStore + 'static,
    {
        let metrics = Arc::new(EngineMetrics::new().context("failed to register metrics")?);
        let resolver = Arc::new(EntitlementResolver::from_config(&config.entitlement));

        let issuer = MediaTokenIssuer::from_config(resolver.clone(), &config.media)
            .context("invalid media signing configuration")?;
        let tokens = MediaTokenService::new(
            store.clone(),
            store.clone(),
            Arc::new(issuer),
            clock.clone(),
            metrics.clone(),
            config.media.base_url.clone(),
        );

        let reconciler = GrantReconciler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            resolver.clone(),
            clock.clone(),
            metrics.clone(),
        );

        let scheduler = PrivilegeExpiryScheduler::new(
            store.clone(),
            store,
            clock,
            metrics.clone(),
            config.scheduler.subject_id.clone(),
            config.scheduler.grace_period_days,
        );

        tracing::debug!(
            enforce_expiry = resolver.enforces_expiry(),
            subject = %scheduler.subject_id(),
            "engine wired"
        );
        Ok(Self {
            resolver,
            reconciler: Arc::new(reconciler),
            tokens: Arc::new(tokens),
            scheduler: Arc::new(scheduler),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SystemClock;
    use crate::store::MemoryStore;

    #[test]
    fn build_rejects_missing_secret() {
        let store = Arc::new(MemoryStore::new());
        assert!(Engine::build(&Config::default(), store, Arc::new(SystemClock)).is_err());
    }

    #[test]
    fn build_honours_entitlement_config() {
        let mut config = Config::default();
        config.media.signing_secret = "k".into();
        config.entitlement.enforce_expiry = false;
        let engine = Engine::build(&config, Arc::new(MemoryStore::new()), Arc::new(SystemClock)).unwrap();
        assert!(!engine.resolver.enforces_expiry());
        assert_eq!(engine.scheduler.subject_id(), "developer");
    }
}
