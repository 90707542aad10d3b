// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod account;
pub mod roles;
pub mod tier;

pub use account::UserAccount;
pub use roles::UserRole;
pub use tier::{meets, rank, Tier};
