// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! In-process store with the same uniqueness rules as the SQLite backend.
//!
//! Used by tests and in-process embedding. Reads and writes can be made to
//! fail on demand to exercise partial-failure paths.

use super::{AccountStore, AuthorizationStore, CatalogStore, GrantStore, StoreError, StoreResult};
use crate::catalog::{MediaItem, Resource};
use crate::grants::AccessGrant;
use crate::identity::{UserAccount, UserRole};
use crate::scheduler::StandingAuthorization;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, UserAccount>,
    resources: BTreeMap<String, Resource>,
    media: HashMap<String, MediaItem>,
    grants: BTreeMap<(String, String), AccessGrant>,
    authorizations: HashMap<String, StandingAuthorization>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing_grant_resources: RwLock<HashSet<String>>,
    fail_role_updates: AtomicBool,
    fail_reads: AtomicBool,
    grant_write_attempts: AtomicUsize,
    role_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is unreachable".into()));
        }
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }

    pub fn put_account(&self, account: UserAccount) -> StoreResult<()> {
        self.write()?.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    pub fn put_resource(&self, resource: Resource) -> StoreResult<()> {
        self.write()?.resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    pub fn put_media_item(&self, item: MediaItem) -> StoreResult<()> {
        self.write()?.media.insert(item.id.clone(), item);
        Ok(())
    }

    /// Make every grant write for `resource_id` fail until cleared.
    pub fn fail_grant_writes_for(&self, resource_id: &str) -> StoreResult<()> {
        self.failing_grant_resources
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(resource_id.to_string());
        Ok(())
    }

    pub fn clear_grant_failures(&self) -> StoreResult<()> {
        self.failing_grant_resources
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }

    pub fn fail_role_updates(&self, fail: bool) {
        self.fail_role_updates.store(fail, Ordering::SeqCst);
    }

    /// Make every trait read fail with `Unavailable` until cleared.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of `upsert_grant` calls seen, successful or not.
    pub fn grant_write_attempts(&self) -> usize {
        self.grant_write_attempts.load(Ordering::SeqCst)
    }

    /// Number of role updates that changed a stored role.
    pub fn role_writes(&self) -> usize {
        self.role_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, user_id: &str) -> StoreResult<Option<UserAccount>> {
        Ok(self.read()?.accounts.get(user_id).cloned())
    }

    async fn set_role(&self, user_id: &str, role: UserRole) -> StoreResult<bool> {
        if self.fail_role_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "role update for '{user_id}' rejected"
            )));
        }
        let mut tables = self.write()?;
        let account = tables
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: user_id.to_string(),
            })?;
        if account.role == role {
            return Ok(false);
        }
        account.role = role;
        self.role_writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn active_resources(&self) -> StoreResult<Vec<Resource>> {
        Ok(self
            .read()?
            .resources
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn get_resource(&self, resource_id: &str) -> StoreResult<Option<Resource>> {
        Ok(self.read()?.resources.get(resource_id).cloned())
    }

    async fn get_media_item(&self, media_id: &str) -> StoreResult<Option<MediaItem>> {
        Ok(self.read()?.media.get(media_id).cloned())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn grants_for_user(&self, user_id: &str) -> StoreResult<Vec<AccessGrant>> {
        Ok(self
            .read()?
            .grants
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_grant(&self, grant: &AccessGrant) -> StoreResult<bool> {
        self.grant_write_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_grant_resources
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .contains(&grant.resource_id);
        if failing {
            return Err(StoreError::Unavailable(format!(
                "grant write for resource '{}' rejected",
                grant.resource_id
            )));
        }
        let key = (grant.user_id.clone(), grant.resource_id.clone());
        let mut tables = self.write()?;
        if tables.grants.contains_key(&key) {
            return Ok(false);
        }
        tables.grants.insert(key, grant.clone());
        Ok(true)
    }
}

#[async_trait]
impl AuthorizationStore for MemoryStore {
    async fn load_authorization(
        &self,
        subject_id: &str,
    ) -> StoreResult<Option<StandingAuthorization>> {
        Ok(self.read()?.authorizations.get(subject_id).cloned())
    }

    async fn save_authorization(&self, record: &StandingAuthorization) -> StoreResult<()> {
        self.write()?
            .authorizations
            .insert(record.subject_id.clone(), record.clone());
        Ok(())
    }

    async fn replace_authorization(
        &self,
        expected: Option<&StandingAuthorization>,
        next: &StandingAuthorization,
    ) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.authorizations.get(&next.subject_id) != expected {
            return Ok(false);
        }
        tables
            .authorizations
            .insert(next.subject_id.clone(), next.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Tier;
    use chrono::Utc;

    #[tokio::test]
    async fn grant_upsert_is_unique_per_pair() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert!(store.upsert_grant(&AccessGrant::license("u", "m", now)).await.unwrap());
        assert!(!store.upsert_grant(&AccessGrant::license("u", "m", now)).await.unwrap());
        assert!(store.upsert_grant(&AccessGrant::license("u", "m2", now)).await.unwrap());
        assert_eq!(store.grants_for_user("u").await.unwrap().len(), 2);
        assert_eq!(store.grant_write_attempts(), 3);
    }

    #[tokio::test]
    async fn injected_grant_failure_is_per_resource() {
        let store = MemoryStore::new();
        store.fail_grant_writes_for("bad").unwrap();
        let now = Utc::now();
        assert!(store.upsert_grant(&AccessGrant::license("u", "bad", now)).await.is_err());
        assert!(store.upsert_grant(&AccessGrant::license("u", "good", now)).await.unwrap());
    }

    #[tokio::test]
    async fn set_role_reports_change_only_once() {
        let store = MemoryStore::new();
        store.put_account(UserAccount::administrator("dev")).unwrap();
        assert!(store.set_role("dev", UserRole::Ordinary).await.unwrap());
        assert!(!store.set_role("dev", UserRole::Ordinary).await.unwrap());
        assert_eq!(store.role_writes(), 1);
    }

    #[tokio::test]
    async fn set_role_unknown_account_is_not_found() {
        let store = MemoryStore::new();
        let err = store.set_role("ghost", UserRole::Ordinary).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_reads_surface_as_unavailable() {
        let store = MemoryStore::new();
        store.put_account(UserAccount::member("u", None)).unwrap();
        store.fail_reads(true);
        assert!(matches!(
            store.get_account("u").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.get_media_item("m").await.is_err());
        store.fail_reads(false);
        assert!(store.get_account("u").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn replace_authorization_requires_matching_record() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let fresh = StandingAuthorization::new_active("dev", now, 30);
        assert!(store.replace_authorization(None, &fresh).await.unwrap());
        assert!(!store.replace_authorization(None, &fresh).await.unwrap());

        let mut lapsed = fresh.clone();
        lapsed.deactivate(now);
        let mut stale = fresh.clone();
        stale.last_renewed_at = now - chrono::Duration::days(1);
        assert!(!store.replace_authorization(Some(&stale), &lapsed).await.unwrap());
        assert!(store.replace_authorization(Some(&fresh), &lapsed).await.unwrap());
        assert!(!store.load_authorization("dev").await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn active_resources_skips_inactive() {
        let store = MemoryStore::new();
        store.put_resource(Resource::new("a", Some(Tier::Pro))).unwrap();
        store.put_resource(Resource::new("b", None).inactive()).unwrap();
        let active = store.active_resources().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "a");
    }
}
