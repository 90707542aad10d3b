// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Timer that drives [`PrivilegeExpiryScheduler::run_once`].

use super::PrivilegeExpiryScheduler;
use chrono::Utc;
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Daily at 03:00 UTC (sec min hour dom month dow).
pub const DEFAULT_SCHEDULE: &str = "0 0 3 * * *";

#[derive(Debug, thiserror::Error)]
#[error("invalid schedule '{expression}': {source}")]
pub struct ScheduleError {
    pub expression: String,
    #[source]
    pub source: cron::error::Error,
}

pub fn parse_schedule(expression: &str) -> Result<Schedule, ScheduleError> {
    Schedule::from_str(expression.trim()).map_err(|source| ScheduleError {
        expression: expression.to_string(),
        source,
    })
}

/// Run the scheduler on every tick of `schedule` until `shutdown` resolves.
///
/// Run failures are logged and the loop keeps going; the next tick retries.
pub async fn run_on_schedule<F>(
    scheduler: Arc<PrivilegeExpiryScheduler>,
    schedule: Schedule,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            info!("schedule has no further ticks, stopping privilege expiry loop");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        debug!(next = %next, "privilege expiry run scheduled");

        tokio::select! {
            () = tokio::time::sleep(wait) => {
                match scheduler.run_once().await {
                    Ok(report) => info!(
                        subject = %scheduler.subject_id(),
                        transition = report.transition.as_str(),
                        state = %report.state,
                        "privilege expiry run finished"
                    ),
                    Err(e) => error!(error = %e, "privilege expiry run failed"),
                }
            }
            () = &mut shutdown => {
                info!("privilege expiry loop shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::EngineMetrics;
    use crate::scheduler::SystemClock;
    use crate::store::{AuthorizationStore, MemoryStore};

    #[test]
    fn default_schedule_parses() {
        let schedule = parse_schedule(DEFAULT_SCHEDULE).unwrap();
        let next = schedule.upcoming(Utc).next().unwrap();
        assert_eq!(next.format("%H:%M:%S").to_string(), "03:00:00");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = parse_schedule("every tuesday").unwrap_err();
        assert_eq!(err.expression, "every tuesday");
    }

    #[tokio::test]
    async fn loop_runs_and_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = Arc::new(PrivilegeExpiryScheduler::new(
            store.clone(),
            store.clone(),
            Arc::new(SystemClock),
            Arc::new(EngineMetrics::new().unwrap()),
            "dev",
            30,
        ));
        let every_second = parse_schedule("* * * * * *").unwrap();
        run_on_schedule(
            scheduler,
            every_second,
            tokio::time::sleep(std::time::Duration::from_millis(2500)),
        )
        .await;

        assert!(store.load_authorization("dev").await.unwrap().is_some());
    }
}
