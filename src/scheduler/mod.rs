// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod authorization;
pub mod clock;
pub mod cron;
pub mod expiry;

pub use authorization::{AuthorizationState, StandingAuthorization};
pub use clock::{Clock, FixedClock, SystemClock};
pub use self::cron::{parse_schedule, run_on_schedule, ScheduleError, DEFAULT_SCHEDULE};
pub use expiry::{PrivilegeExpiryScheduler, SchedulerError, SchedulerReport, Transition};
