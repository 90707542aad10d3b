// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::identity::Tier;
use crate::scheduler::DEFAULT_SCHEDULE;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SIGNING_SECRET_ENV: &str = "COURSEGATE_SIGNING_SECRET";
pub const TRIGGER_SECRET_ENV: &str = "COURSEGATE_TRIGGER_SECRET";
pub const SERVICE_SECRET_ENV: &str = "COURSEGATE_SERVICE_SECRET";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("net", "coursegate", "coursegate")
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "[unset]"
    } else {
        "[redacted]"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub entitlement: EntitlementConfig,
    pub media: MediaConfig,
    pub scheduler: SchedulerConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
    pub observability: ObservabilityConfig,
}

impl Config {
    /// `<platform config dir>/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse configuration")
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    /// Secret environment variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
                Self::read(&path)?
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => {
                    tracing::debug!("no configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Secrets from the environment take precedence over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SIGNING_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.media.signing_secret = secret;
        }
        if let Some(secret) = lookup(TRIGGER_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.scheduler.trigger_secret = Some(secret);
        }
        if let Some(secret) = lookup(SERVICE_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.gateway.service_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.media.signing_secret.trim().is_empty() {
            bail!("media.signing_secret is empty (set it or {SIGNING_SECRET_ENV})");
        }
        if !self.media.path_template.contains("{asset}") {
            bail!("media.path_template must contain {{asset}}");
        }
        if self.media.path_template.contains("{library}") && self.media.library_id.trim().is_empty()
        {
            bail!("media.library_id is empty but media.path_template uses {{library}}");
        }
        if self.media.default_ttl_secs == 0 || self.media.max_ttl_secs == 0 {
            bail!("media ttl values must be positive");
        }
        if self.media.default_ttl_secs > self.media.max_ttl_secs {
            bail!(
                "media.default_ttl_secs ({}) exceeds media.max_ttl_secs ({})",
                self.media.default_ttl_secs,
                self.media.max_ttl_secs
            );
        }
        if self.scheduler.grace_period_days == 0 {
            bail!("scheduler.grace_period_days must be at least 1");
        }
        if self.scheduler.subject_id.trim().is_empty() {
            bail!("scheduler.subject_id is empty");
        }
        crate::scheduler::parse_schedule(&self.scheduler.schedule)?;
        if self.gateway.request_timeout_secs == 0 {
            bail!("gateway.request_timeout_secs must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementConfig {
    /// Collapse licenses whose validity ended in the past to no access.
    pub enforce_expiry: bool,
    /// Extra license spellings, merged over the built-in alias table.
    pub legacy_aliases: HashMap<String, Tier>,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            enforce_expiry: true,
            legacy_aliases: HashMap::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub signing_secret: String,
    pub base_url: String,
    /// Supports `{library}` and `{asset}`.
    pub path_template: String,
    pub library_id: String,
    pub default_ttl_secs: u64,
    pub max_ttl_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            base_url: "https://media.example.net".into(),
            path_template: "/embed/{library}/{asset}".into(),
            library_id: String::new(),
            default_ttl_secs: 4 * 3600,
            max_ttl_secs: 24 * 3600,
        }
    }
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("signing_secret", &redacted(&self.signing_secret))
            .field("base_url", &self.base_url)
            .field("path_template", &self.path_template)
            .field("library_id", &self.library_id)
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("max_ttl_secs", &self.max_ttl_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Account whose elevated role hangs on the standing authorization.
    pub subject_id: String,
    /// Used when the cold-start record is created.
    pub grace_period_days: u32,
    /// Six-field cron expression, UTC.
    pub schedule: String,
    pub trigger_secret: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            subject_id: "developer".into(),
            grace_period_days: 30,
            schedule: DEFAULT_SCHEDULE.into(),
            trigger_secret: None,
        }
    }
}

impl std::fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("subject_id", &self.subject_id)
            .field("grace_period_days", &self.grace_period_days)
            .field("schedule", &self.schedule)
            .field(
                "trigger_secret",
                &self.trigger_secret.as_deref().map(redacted),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join("coursegate.db"))
            .unwrap_or_else(|| PathBuf::from("coursegate.db"));
        Self {
            path: path.to_string_lossy().into_owned(),
        }
    }
}

impl StoreConfig {
    /// Database path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).as_ref())
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// Bearer secret the application backend presents when requesting
    /// playback tokens. The token endpoint refuses every call while unset.
    pub service_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8480,
            request_timeout_secs: 30,
            service_secret: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "service_secret",
                &self.service_secret.as_deref().map(redacted),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}
