//! One run of the regional outbreak-alert job.
//!
//! A run is stateless: clusters and recipients are recomputed from the log
//! every time. Only the aggregation query can fail the run; everything after
//! it degrades to skip-and-log.

use chrono::{DateTime, Duration as WindowDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::dispatch::{DispatchReport, NotificationDispatcher, DEFAULT_MAX_CONCURRENT_SENDS};
use super::message::OutbreakAlert;
use super::recipients::plan_recipients;
use super::threshold::{qualifying_clusters, DEFAULT_MIN_CLUSTER_SIZE};
use crate::ports::{DiagnosisLog, PortError};

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The log could not be aggregated; nothing was sent.
    #[error("Aggregation query failed: {0}")]
    Aggregation(#[source] PortError),
}

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    /// Trailing span of records considered recent.
    pub window: WindowDuration,
    pub min_cluster_size: usize,
    pub max_concurrent_sends: usize,
    /// Upper bound on one run; work left past it is abandoned.
    pub run_timeout: Duration,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            window: WindowDuration::hours(24),
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
            run_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// What a run did, including everything it silently skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertRunSummary {
    pub clusters_found: usize,
    pub clusters_qualifying: usize,
    pub clusters_alerted: usize,
    pub cluster_fetch_failures: usize,
    pub clusters_abandoned: usize,
    pub recipients_missing_email: usize,
    pub duplicates_suppressed: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub sms_sent: usize,
    pub sms_failed: usize,
    pub sends_abandoned: usize,
}

impl AlertRunSummary {
    fn absorb(&mut self, report: DispatchReport) {
        self.emails_sent += report.emails_sent;
        self.emails_failed += report.emails_failed;
        self.sms_sent += report.sms_sent;
        self.sms_failed += report.sms_failed;
        self.sends_abandoned += report.abandoned;
    }
}

/// The regional outbreak-alert job, built once at startup with its collaborators.
pub struct RegionalAlertJob {
    log: Arc<dyn DiagnosisLog>,
    dispatcher: NotificationDispatcher,
    settings: AlertSettings,
}

impl RegionalAlertJob {
    pub fn new(log: Arc<dyn DiagnosisLog>, dispatcher: NotificationDispatcher, settings: AlertSettings) -> Self {
        Self {
            log,
            dispatcher,
            settings,
        }
    }

    /// Runs the job once as of `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<AlertRunSummary, AlertError> {
        let deadline = Instant::now() + self.settings.run_timeout;
        let since = now - self.settings.window;
        let mut summary = AlertRunSummary::default();

        let clusters = self
            .log
            .aggregate_diseased_since(since)
            .await
            .map_err(AlertError::Aggregation)?;
        summary.clusters_found = clusters.len();
        info!(clusters = clusters.len(), since = %since, "Aggregated recent diseased diagnoses");

        let qualifying = qualifying_clusters(clusters, self.settings.min_cluster_size);
        summary.clusters_qualifying = qualifying.len();

        for cluster in &qualifying {
            if Instant::now() >= deadline {
                summary.clusters_abandoned += 1;
                warn!(region = %cluster.region, disease = %cluster.disease, "Run deadline passed, cluster abandoned");
                continue;
            }

            info!(
                region = %cluster.region,
                disease = %cluster.disease,
                unique_users = cluster.unique_user_count,
                "Outbreak cluster qualifies for alerting"
            );

            let records = match self.log.find_by_district(&cluster.region).await {
                Ok(records) => records,
                Err(e) => {
                    summary.cluster_fetch_failures += 1;
                    error!(region = %cluster.region, error = %e, "Failed to fetch records for cluster, skipping");
                    continue;
                }
            };

            let plan = plan_recipients(&records, self.dispatcher.sms_enabled());
            summary.recipients_missing_email += plan.missing_email;
            summary.duplicates_suppressed += plan.duplicates;

            let alert = OutbreakAlert::from(cluster);
            let report = self.dispatcher.dispatch(&alert, plan.recipients, deadline).await;
            summary.absorb(report);
            summary.clusters_alerted += 1;
        }

        info!(
            clusters_found = summary.clusters_found,
            clusters_alerted = summary.clusters_alerted,
            emails_sent = summary.emails_sent,
            emails_failed = summary.emails_failed,
            sms_sent = summary.sms_sent,
            sms_failed = summary.sms_failed,
            missing_email = summary.recipients_missing_email,
            abandoned = summary.sends_abandoned + summary.clusters_abandoned,
            "Regional alert run finished"
        );
        Ok(summary)
    }
}
