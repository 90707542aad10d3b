// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Persistence seams.
//!
//! The engine never talks to a database directly; it goes through these
//! traits. Writes that may race must be idempotent upserts keyed by a
//! uniqueness constraint (grants) or conditional on the row they read
//! (authorization records). Repeated and overlapping runs rely on that
//! instead of a lock.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::catalog::{MediaItem, Resource};
use crate::grants::AccessGrant;
use crate::identity::{UserAccount, UserRole};
use crate::scheduler::StandingAuthorization;
use async_trait::async_trait;

/// Store failure. Always surfaced, never swallowed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("corrupt {entity} row '{id}': {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("write rejected: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn corrupt(entity: &'static str, id: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            entity,
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Identity source: account snapshots and the single role update the
/// scheduler is allowed to make.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, user_id: &str) -> StoreResult<Option<UserAccount>>;

    /// Set the role of `user_id`. Returns `true` when the stored role changed.
    async fn set_role(&self, user_id: &str, role: UserRole) -> StoreResult<bool>;
}

/// Content catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All resources whose active flag is set.
    async fn active_resources(&self) -> StoreResult<Vec<Resource>>;

    async fn get_resource(&self, resource_id: &str) -> StoreResult<Option<Resource>>;

    async fn get_media_item(&self, media_id: &str) -> StoreResult<Option<MediaItem>>;
}

/// Grant records, unique on `(user_id, resource_id)`.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn grants_for_user(&self, user_id: &str) -> StoreResult<Vec<AccessGrant>>;

    /// Insert keyed on `(user_id, resource_id)`.
    ///
    /// Returns `true` when a new row was written and `false` when a grant for
    /// the pair already existed (the existing row is left untouched).
    async fn upsert_grant(&self, grant: &AccessGrant) -> StoreResult<bool>;
}

/// Standing authorization records, one per subject.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    async fn load_authorization(&self, subject_id: &str)
        -> StoreResult<Option<StandingAuthorization>>;

    async fn save_authorization(&self, record: &StandingAuthorization) -> StoreResult<()>;

    /// Write `next` only if the stored record still equals `expected`
    /// (`None`: no record exists yet).
    ///
    /// Returns `false` and leaves the row untouched when another writer got
    /// there first.
    async fn replace_authorization(
        &self,
        expected: Option<&StandingAuthorization>,
        next: &StandingAuthorization,
    ) -> StoreResult<bool>;
}

/// Everything the engine needs from a single backend.
pub trait EngineStore: AccountStore + CatalogStore + GrantStore + AuthorizationStore {}

impl<T> EngineStore for T where T: AccountStore + CatalogStore + GrantStore + AuthorizationStore {}
