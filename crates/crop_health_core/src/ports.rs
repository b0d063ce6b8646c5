//! crates/crop_health_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! notification providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::alerts::OutbreakAlert;
use crate::domain::{DiagnosisRecord, NewDiagnosis, RegionCluster};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The shared, append-only log of diagnosis records.
#[async_trait]
pub trait DiagnosisLog: Send + Sync {
    // --- Writes (upload and resolve paths) ---
    async fn insert_diagnosis(&self, diagnosis: NewDiagnosis) -> PortResult<DiagnosisRecord>;

    /// Deletes a record owned by `user_id`.
    ///
    /// Returns `NotFound` when the record does not exist and `Unauthorized`
    /// when it belongs to another user.
    async fn delete_for_user(&self, id: Uuid, user_id: &str) -> PortResult<()>;

    // --- Alert job reads ---

    /// Groups Diseased records created at or after `since` by (district, disease)
    /// and counts the distinct users in each group.
    async fn aggregate_diseased_since(&self, since: DateTime<Utc>)
        -> PortResult<Vec<RegionCluster>>;

    /// Every record in `district` regardless of status or age, oldest first.
    async fn find_by_district(&self, district: &str) -> PortResult<Vec<DiagnosisRecord>>;

    // --- History reads ---

    /// All Diseased records, newest first.
    async fn list_diseased(&self) -> PortResult<Vec<DiagnosisRecord>>;

    async fn list_for_user(&self, user_id: &str) -> PortResult<Vec<DiagnosisRecord>>;
}

#[async_trait]
pub trait EmailChannel: Send + Sync {
    /// Sends one outbreak warning to an email address. Fire-and-forget: no
    /// delivery receipt is consumed.
    async fn send_outbreak_alert(&self, address: &str, alert: &OutbreakAlert) -> PortResult<()>;
}

#[async_trait]
pub trait SmsChannel: Send + Sync {
    /// Sends one outbreak warning to an already normalized phone number.
    async fn send_outbreak_alert(&self, phone: &str, alert: &OutbreakAlert) -> PortResult<()>;
}
