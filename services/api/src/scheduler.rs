//! services/api/src/scheduler.rs
//!
//! Drives the regional alert job from a cron schedule.
//!
//! Runs are sequential: the next fire time is only computed after the previous
//! run returns, so two runs never overlap.

use chrono::{DateTime, Utc};
use crop_health_core::RegionalAlertJob;
use cron::Schedule;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Owns the alert job and the schedule that triggers it.
pub struct AlertScheduler {
    job: Arc<RegionalAlertJob>,
    schedule: Schedule,
}

impl AlertScheduler {
    pub fn new(job: Arc<RegionalAlertJob>, schedule: Schedule) -> Self {
        Self { job, schedule }
    }

    /// Spawns the scheduling loop. It stops when `shutdown` is cancelled,
    /// abandoning a run that is still in progress.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, shutdown: CancellationToken) {
        info!(schedule = ?self.schedule, "Regional alert scheduler started");

        loop {
            let now = Utc::now();
            let Some(next) = next_fire_after(&self.schedule, now) else {
                warn!("Alert schedule has no upcoming fire times, scheduler stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "Next regional alert run scheduled");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Regional alert scheduler shutting down");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            info!("Running region-based disease alert job");
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!("Shutdown requested during an alert run, abandoning it");
                    return;
                }
                result = self.job.run_once(Utc::now()) => match result {
                    Ok(summary) => info!(?summary, "Regional alert run completed"),
                    Err(e) => error!(error = %e, "Regional alert run failed, waiting for next trigger"),
                },
            }
        }
    }
}

/// The first fire time strictly after `after`.
pub fn next_fire_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}
