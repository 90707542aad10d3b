// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! SQLite backend.
//!
//! Uniqueness lives in the schema: `access_grants` is unique on
//! `(user_id, resource_id)` and `standing_authorizations` on `subject_id`.
//! Writes are `INSERT ... ON CONFLICT`, except the scheduler's conditional
//! `UPDATE` of an authorization row. Timestamps are RFC 3339 text.
//! Trait calls run on the blocking pool.

use super::{AccountStore, AuthorizationStore, CatalogStore, GrantStore, StoreError, StoreResult};
use crate::catalog::{MediaItem, Resource};
use crate::grants::{AccessGrant, GrantKind};
use crate::identity::{Tier, UserAccount, UserRole};
use crate::scheduler::StandingAuthorization;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id                  TEXT PRIMARY KEY,
        role                TEXT NOT NULL DEFAULT 'ordinary',
        license             TEXT,
        license_valid_until TEXT
    );
    CREATE TABLE IF NOT EXISTS resources (
        id            TEXT PRIMARY KEY,
        required_tier TEXT,
        is_active     INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS media_items (
        id           TEXT PRIMARY KEY,
        resource_id  TEXT NOT NULL,
        video_asset  TEXT NOT NULL,
        open_preview INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS access_grants (
        user_id     TEXT NOT NULL,
        resource_id TEXT NOT NULL,
        grant_kind  TEXT NOT NULL,
        granted_at  TEXT NOT NULL,
        UNIQUE (user_id, resource_id)
    );
    CREATE INDEX IF NOT EXISTS idx_access_grants_user ON access_grants(user_id);
    CREATE TABLE IF NOT EXISTS standing_authorizations (
        subject_id        TEXT PRIMARY KEY,
        active            INTEGER NOT NULL,
        last_renewed_at   TEXT NOT NULL,
        deactivated_at    TEXT,
        grace_period_days INTEGER NOT NULL
    );
";

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }

    pub fn put_account(&self, account: &UserAccount) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO accounts (id, role, license, license_valid_until)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               role = excluded.role,
               license = excluded.license,
               license_valid_until = excluded.license_valid_until",
            params![
                &account.id,
                account.role.as_str(),
                &account.license,
                account.license_valid_until.map(format_ts),
            ],
        )?;
        Ok(())
    }

    pub fn put_resource(&self, resource: &Resource) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO resources (id, required_tier, is_active)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               required_tier = excluded.required_tier,
               is_active = excluded.is_active",
            params![
                &resource.id,
                resource.required_tier.map(Tier::as_str),
                resource.is_active,
            ],
        )?;
        Ok(())
    }

    pub fn put_media_item(&self, item: &MediaItem) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO media_items (id, resource_id, video_asset, open_preview)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               resource_id = excluded.resource_id,
               video_asset = excluded.video_asset,
               open_preview = excluded.open_preview",
            params![&item.id, &item.resource_id, &item.video_asset, item.open_preview],
        )?;
        Ok(())
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(entity: &'static str, id: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(entity, id, format!("bad timestamp '{raw}': {e}")))
}

fn parse_opt_ts(
    entity: &'static str,
    id: &str,
    raw: Option<String>,
) -> StoreResult<Option<DateTime<Utc>>> {
    raw.map(|r| parse_ts(entity, id, &r)).transpose()
}

struct RawResource {
    id: String,
    required_tier: Option<String>,
    is_active: bool,
}

impl RawResource {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            required_tier: row.get(1)?,
            is_active: row.get(2)?,
        })
    }

    fn decode(self) -> StoreResult<Resource> {
        let required_tier = self
            .required_tier
            .as_deref()
            .map(str::parse::<Tier>)
            .transpose()
            .map_err(|e| StoreError::corrupt("resource", &self.id, e))?;
        Ok(Resource {
            id: self.id,
            required_tier,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn get_account(&self, user_id: &str) -> StoreResult<Option<UserAccount>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, role, license, license_valid_until FROM accounts WHERE id = ?1",
                    params![user_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(id, role, license, valid_until)| {
                let license_valid_until = parse_opt_ts("account", &id, valid_until)?;
                Ok(UserAccount {
                    role: UserRole::from_stored(&role),
                    license,
                    license_valid_until,
                    id,
                })
            })
            .transpose()
        })
        .await
    }

    async fn set_role(&self, user_id: &str, role: UserRole) -> StoreResult<bool> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE accounts SET role = ?2 WHERE id = ?1 AND role <> ?2",
                params![user_id, role.as_str()],
            )?;
            if changed == 0 {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?1)",
                    params![user_id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(StoreError::NotFound {
                        entity: "account",
                        id: user_id,
                    });
                }
            }
            Ok(changed > 0)
        })
        .await
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn active_resources(&self) -> StoreResult<Vec<Resource>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, required_tier, is_active FROM resources
                 WHERE is_active = 1 ORDER BY id",
            )?;
            let raw = stmt
                .query_map([], RawResource::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raw.into_iter().map(RawResource::decode).collect()
        })
        .await
    }

    async fn get_resource(&self, resource_id: &str) -> StoreResult<Option<Resource>> {
        let resource_id = resource_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, required_tier, is_active FROM resources WHERE id = ?1",
                params![resource_id],
                RawResource::from_row,
            )
            .optional()?
            .map(RawResource::decode)
            .transpose()
        })
        .await
    }

    async fn get_media_item(&self, media_id: &str) -> StoreResult<Option<MediaItem>> {
        let media_id = media_id.to_string();
        self.with_conn(move |conn| {
            let item = conn
                .query_row(
                    "SELECT id, resource_id, video_asset, open_preview
                     FROM media_items WHERE id = ?1",
                    params![media_id],
                    |row| {
                        Ok(MediaItem {
                            id: row.get(0)?,
                            resource_id: row.get(1)?,
                            video_asset: row.get(2)?,
                            open_preview: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(item)
        })
        .await
    }
}

#[async_trait]
impl GrantStore for SqliteStore {
    async fn grants_for_user(&self, user_id: &str) -> StoreResult<Vec<AccessGrant>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT resource_id, grant_kind, granted_at FROM access_grants
                 WHERE user_id = ?1 ORDER BY resource_id",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(resource_id, kind, granted_at)| {
                    let id = format!("{user_id}/{resource_id}");
                    let kind = GrantKind::from_stored(&kind).ok_or_else(|| {
                        StoreError::corrupt("grant", &id, format!("unknown grant kind '{kind}'"))
                    })?;
                    Ok(AccessGrant {
                        user_id: user_id.clone(),
                        granted_at: parse_ts("grant", &id, &granted_at)?,
                        resource_id,
                        kind,
                    })
                })
                .collect()
        })
        .await
    }

    async fn upsert_grant(&self, grant: &AccessGrant) -> StoreResult<bool> {
        let grant = grant.clone();
        self.with_conn(move |conn| {
            let written = conn.execute(
                "INSERT INTO access_grants (user_id, resource_id, grant_kind, granted_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, resource_id) DO NOTHING",
                params![
                    &grant.user_id,
                    &grant.resource_id,
                    grant.kind.as_str(),
                    format_ts(grant.granted_at),
                ],
            )?;
            Ok(written > 0)
        })
        .await
    }
}

#[async_trait]
impl AuthorizationStore for SqliteStore {
    async fn load_authorization(
        &self,
        subject_id: &str,
    ) -> StoreResult<Option<StandingAuthorization>> {
        let subject_id = subject_id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT active, last_renewed_at, deactivated_at, grace_period_days
                     FROM standing_authorizations WHERE subject_id = ?1",
                    params![subject_id],
                    |row| {
                        Ok((
                            row.get::<_, bool>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, u32>(3)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(active, last_renewed, deactivated, grace_period_days)| {
                Ok(StandingAuthorization {
                    active,
                    last_renewed_at: parse_ts("authorization", &subject_id, &last_renewed)?,
                    deactivated_at: parse_opt_ts("authorization", &subject_id, deactivated)?,
                    grace_period_days,
                    subject_id: subject_id.clone(),
                })
            })
            .transpose()
        })
        .await
    }

    async fn save_authorization(&self, record: &StandingAuthorization) -> StoreResult<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO standing_authorizations
                 (subject_id, active, last_renewed_at, deactivated_at, grace_period_days)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(subject_id) DO UPDATE SET
                   active = excluded.active,
                   last_renewed_at = excluded.last_renewed_at,
                   deactivated_at = excluded.deactivated_at,
                   grace_period_days = excluded.grace_period_days",
                params![
                    &record.subject_id,
                    record.active,
                    format_ts(record.last_renewed_at),
                    record.deactivated_at.map(format_ts),
                    record.grace_period_days,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn replace_authorization(
        &self,
        expected: Option<&StandingAuthorization>,
        next: &StandingAuthorization,
    ) -> StoreResult<bool> {
        let expected = expected.cloned();
        let next = next.clone();
        self.with_conn(move |conn| {
            let written = match expected {
                None => conn.execute(
                    "INSERT INTO standing_authorizations
                     (subject_id, active, last_renewed_at, deactivated_at, grace_period_days)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(subject_id) DO NOTHING",
                    params![
                        &next.subject_id,
                        next.active,
                        format_ts(next.last_renewed_at),
                        next.deactivated_at.map(format_ts),
                        next.grace_period_days,
                    ],
                )?,
                Some(expected) => conn.execute(
                    "UPDATE standing_authorizations
                     SET active = ?2, last_renewed_at = ?3, deactivated_at = ?4,
                         grace_period_days = ?5
                     WHERE subject_id = ?1
                       AND active = ?6
                       AND last_renewed_at = ?7
                       AND deactivated_at IS ?8",
                    params![
                        &next.subject_id,
                        next.active,
                        format_ts(next.last_renewed_at),
                        next.deactivated_at.map(format_ts),
                        next.grace_period_days,
                        expected.active,
                        format_ts(expected.last_renewed_at),
                        expected.deactivated_at.map(format_ts),
                    ],
                )?,
            };
            Ok(written > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn account_roundtrip_with_expiry() {
        let store = SqliteStore::open_in_memory().unwrap();
        let until = Utc::now() + Duration::days(3);
        let account = UserAccount::member("u1", Some("premium")).with_expiry(until);
        store.put_account(&account).unwrap();

        let loaded = store.get_account("u1").await.unwrap().unwrap();
        assert_eq!(loaded.license.as_deref(), Some("premium"));
        assert_eq!(loaded.role, UserRole::Ordinary);
        assert_eq!(
            loaded.license_valid_until.map(|t| t.timestamp_micros()),
            Some(until.timestamp_micros())
        );
        assert!(store.get_account("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_role_is_conditional() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put_account(&UserAccount::administrator("dev")).unwrap();
        assert!(store.set_role("dev", UserRole::Ordinary).await.unwrap());
        assert!(!store.set_role("dev", UserRole::Ordinary).await.unwrap());
        assert!(matches!(
            store.set_role("ghost", UserRole::Ordinary).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn grant_upsert_keeps_first_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = Utc::now() - Duration::days(10);
        let mut manual = AccessGrant::license("u1", "m1", first);
        manual.kind = GrantKind::Manual;

        assert!(store.upsert_grant(&manual).await.unwrap());
        assert!(!store
            .upsert_grant(&AccessGrant::license("u1", "m1", Utc::now()))
            .await
            .unwrap());

        let grants = store.grants_for_user("u1").await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].kind, GrantKind::Manual);
        assert_eq!(grants[0].granted_at.timestamp(), first.timestamp());
    }

    #[tokio::test]
    async fn null_required_tier_roundtrips_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put_resource(&Resource::new("m1", None)).unwrap();
        store.put_resource(&Resource::new("m2", Some(Tier::Elite))).unwrap();
        store.put_resource(&Resource::new("m3", Some(Tier::Pro)).inactive()).unwrap();

        let active = store.active_resources().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].required_tier, None);
        assert_eq!(active[1].required_tier, Some(Tier::Elite));
        assert!(!store.get_resource("m3").await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn garbage_required_tier_is_corrupt_not_open() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO resources (id, required_tier, is_active) VALUES ('m1', 'gold', 1)",
                [],
            )
            .unwrap();
        let err = store.get_resource("m1").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { entity: "resource", .. }));
    }

    #[tokio::test]
    async fn authorization_upsert_replaces_state() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&tmp.path().join("data/coursegate.db")).unwrap();
        let now = Utc::now();
        let mut record = StandingAuthorization::new_active("dev", now, 30);
        store.save_authorization(&record).await.unwrap();

        record.deactivate(now + Duration::days(31));
        store.save_authorization(&record).await.unwrap();

        let loaded = store.load_authorization("dev").await.unwrap().unwrap();
        assert!(!loaded.active);
        assert_eq!(
            loaded.deactivated_at.map(|t| t.timestamp()),
            Some((now + Duration::days(31)).timestamp())
        );
        assert!(store.load_authorization("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_authorization_rejects_stale_expectation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let fresh = StandingAuthorization::new_active("dev", now, 30);
        assert!(store.replace_authorization(None, &fresh).await.unwrap());
        assert!(!store.replace_authorization(None, &fresh).await.unwrap());

        let loaded = store.load_authorization("dev").await.unwrap().unwrap();
        let mut renewed = loaded.clone();
        renewed.renew(now + Duration::days(1));
        store.save_authorization(&renewed).await.unwrap();

        let mut lapsed = loaded.clone();
        lapsed.deactivate(now + Duration::days(31));
        assert!(!store.replace_authorization(Some(&loaded), &lapsed).await.unwrap());
        assert!(store.load_authorization("dev").await.unwrap().unwrap().active);

        let current = store.load_authorization("dev").await.unwrap().unwrap();
        assert!(store.replace_authorization(Some(&current), &lapsed).await.unwrap());
        let stored = store.load_authorization("dev").await.unwrap().unwrap();
        assert!(!stored.active);
        assert!(stored.deactivated_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_reads_share_the_connection() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.put_account(&UserAccount::member("u1", Some("vip"))).unwrap();
        let reads = (0..8).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get_account("u1").await })
        });
        for read in futures::future::join_all(reads).await {
            assert!(read.unwrap().unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn media_item_lookup() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .put_media_item(&MediaItem::new("l1", "m1", "asset-guid").preview())
            .unwrap();
        let item = store.get_media_item("l1").await.unwrap().unwrap();
        assert!(item.open_preview);
        assert_eq!(item.video_asset, "asset-guid");
    }
}
