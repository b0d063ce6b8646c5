//! Notification fan-out for one cluster.
//!
//! Planned sends run as a bounded task group. Each send's outcome is captured
//! on its own; a provider error is logged and counted, never retried, and never
//! stops the remaining sends.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use super::message::OutbreakAlert;
use super::recipients::Recipient;
use crate::ports::{EmailChannel, PortError, SmsChannel};

pub const DEFAULT_MAX_CONCURRENT_SENDS: usize = 8;

/// Per-cluster counters produced by [`NotificationDispatcher::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub sms_sent: usize,
    pub sms_failed: usize,
    /// Sends not attempted or cut off because the run deadline passed.
    pub abandoned: usize,
}

enum SendOutcome {
    Sent,
    Failed(PortError),
    Abandoned,
}

/// Sends alerts over the email channel and, when configured, the SMS channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    email: Arc<dyn EmailChannel>,
    sms: Option<Arc<dyn SmsChannel>>,
    max_concurrent_sends: usize,
}

impl NotificationDispatcher {
    pub fn new(email: Arc<dyn EmailChannel>, max_concurrent_sends: usize) -> Self {
        Self {
            email,
            sms: None,
            max_concurrent_sends: max_concurrent_sends.max(1),
        }
    }

    /// Enables the secondary SMS channel.
    pub fn with_sms(mut self, sms: Arc<dyn SmsChannel>) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn sms_enabled(&self) -> bool {
        self.sms.is_some()
    }

    /// Sends `alert` to every recipient, at most `max_concurrent_sends` at a time.
    /// Always completes; failures are reported in the returned counters.
    pub async fn dispatch(
        &self,
        alert: &OutbreakAlert,
        recipients: Vec<Recipient>,
        deadline: Instant,
    ) -> DispatchReport {
        let outcomes: Vec<(Recipient, SendOutcome)> = stream::iter(recipients)
            .map(move |recipient| async move {
                let outcome = self.send_before(&recipient, alert, deadline).await;
                (recipient, outcome)
            })
            .buffer_unordered(self.max_concurrent_sends)
            .collect()
            .await;

        let mut report = DispatchReport::default();
        for (recipient, outcome) in outcomes {
            match (&recipient, outcome) {
                (Recipient::Email(address), SendOutcome::Sent) => {
                    report.emails_sent += 1;
                    info!(region = %alert.region, disease = %alert.disease, recipient = %address, "Email alert sent");
                }
                (Recipient::Sms(phone), SendOutcome::Sent) => {
                    report.sms_sent += 1;
                    info!(region = %alert.region, disease = %alert.disease, recipient = %phone, "SMS alert sent");
                }
                (Recipient::Email(address), SendOutcome::Failed(e)) => {
                    report.emails_failed += 1;
                    warn!(region = %alert.region, recipient = %address, error = %e, "Email alert failed, skipping recipient");
                }
                (Recipient::Sms(phone), SendOutcome::Failed(e)) => {
                    report.sms_failed += 1;
                    warn!(region = %alert.region, recipient = %phone, error = %e, "SMS alert failed, skipping recipient");
                }
                (_, SendOutcome::Abandoned) => {
                    report.abandoned += 1;
                    warn!(region = %alert.region, recipient = %recipient.address(), "Run deadline passed, alert abandoned");
                }
            }
        }
        report
    }

    async fn send_before(&self, recipient: &Recipient, alert: &OutbreakAlert, deadline: Instant) -> SendOutcome {
        if Instant::now() >= deadline {
            return SendOutcome::Abandoned;
        }

        let send = async {
            match recipient {
                Recipient::Email(address) => self.email.send_outbreak_alert(address, alert).await,
                Recipient::Sms(phone) => match &self.sms {
                    Some(sms) => sms.send_outbreak_alert(phone, alert).await,
                    None => Err(PortError::Unexpected("SMS channel is not configured".to_string())),
                },
            }
        };

        match timeout_at(deadline, send).await {
            Ok(Ok(())) => SendOutcome::Sent,
            Ok(Err(e)) => SendOutcome::Failed(e),
            Err(_) => SendOutcome::Abandoned,
        }
    }
}
