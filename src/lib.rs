// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! License entitlement and secure media access engine.
//!
//! Decides which content tier an account may reach, keeps persisted access
//! grants in line with that decision, mints short-lived signed playback
//! tokens, and decays a standing elevated role after a lapsed renewal.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod entitlement;
pub mod gateway;
pub mod grants;
pub mod identity;
pub mod media;
pub mod observability;
pub mod scheduler;
pub mod store;

pub use config::Config;
pub use engine::Engine;
pub use identity::{meets, rank, Tier, UserAccount, UserRole};
