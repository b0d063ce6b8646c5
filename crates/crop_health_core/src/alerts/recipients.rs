//! Recipient dedup for one cluster.
//!
//! The seen-sets live only for the cluster being processed; nothing carries
//! over between runs, so a user in two consecutive qualifying runs is alerted
//! twice.

use std::collections::HashSet;
use tracing::{debug, warn};

use super::phone::normalize_phone;
use crate::domain::DiagnosisRecord;

/// A single contact channel that should receive the cluster's alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    Email(String),
    Sms(String),
}

impl Recipient {
    pub fn address(&self) -> &str {
        match self {
            Recipient::Email(address) | Recipient::Sms(address) => address,
        }
    }
}

/// The deduplicated sends for one cluster, in record arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientPlan {
    pub recipients: Vec<Recipient>,
    /// Records that carried no usable email address.
    pub missing_email: usize,
    /// Records whose channel was already planned earlier in this cluster.
    pub duplicates: usize,
}

impl RecipientPlan {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Walks `records` in order and plans at most one send per email address and,
/// when `include_sms` is set, one per normalized phone number.
pub fn plan_recipients(records: &[DiagnosisRecord], include_sms: bool) -> RecipientPlan {
    let mut plan = RecipientPlan::default();
    let mut seen_emails: HashSet<String> = HashSet::new();
    let mut seen_phones: HashSet<String> = HashSet::new();

    for record in records {
        match record.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => {
                if seen_emails.insert(email.to_string()) {
                    plan.recipients.push(Recipient::Email(email.to_string()));
                } else {
                    plan.duplicates += 1;
                }
            }
            None => {
                plan.missing_email += 1;
                warn!(user_id = %record.user_id, record_id = %record.id, "No email found on diagnosis record");
            }
        }

        if !include_sms {
            continue;
        }
        match record.phone.as_deref().and_then(normalize_phone) {
            Some(phone) => {
                if seen_phones.insert(phone.clone()) {
                    plan.recipients.push(Recipient::Sms(phone));
                } else {
                    plan.duplicates += 1;
                }
            }
            None => debug!(user_id = %record.user_id, "No phone found on diagnosis record"),
        }
    }

    plan
}
