//! crates/crop_health_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The label used whenever a location or disease could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Health verdict attached to every diagnosis record at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosisStatus {
    Healthy,
    Diseased,
    UnknownDisease,
}

impl DiagnosisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisStatus::Healthy => "Healthy",
            DiagnosisStatus::Diseased => "Diseased",
            DiagnosisStatus::UnknownDisease => "Unknown disease",
        }
    }
}

impl fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid diagnosis status")]
pub struct InvalidStatus(pub String);

impl FromStr for DiagnosisStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Healthy" => Ok(DiagnosisStatus::Healthy),
            "Diseased" => Ok(DiagnosisStatus::Diseased),
            "Unknown disease" => Ok(DiagnosisStatus::UnknownDisease),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Where a photo was taken. `region` and `district` are resolved upstream by
/// reverse geocoding and hold `"Unknown"` when that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub region: String,
    pub district: String,
}

impl Location {
    pub fn new(lat: Option<f64>, lng: Option<f64>, region: &str, district: &str) -> Self {
        Self {
            lat,
            lng,
            region: or_unknown(region),
            district: or_unknown(district),
        }
    }

    pub fn unknown() -> Self {
        Self::new(None, None, UNKNOWN, UNKNOWN)
    }
}

/// One entry of the append-only diagnosis log, written once per upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisRecord {
    pub id: Uuid,
    /// Opaque reporter id, compared verbatim.
    pub user_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub prediction: String,
    pub status: DiagnosisStatus,
    pub location: Location,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl DiagnosisRecord {
    /// The district used as the cluster key, falling back to `"Unknown"`.
    pub fn district_key(&self) -> String {
        or_unknown(&self.location.district)
    }

    /// The disease label used as the cluster key, falling back to `"Unknown"`.
    pub fn disease_key(&self) -> String {
        or_unknown(&self.prediction)
    }
}

/// The payload for appending a record; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDiagnosis {
    pub user_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub prediction: String,
    pub status: DiagnosisStatus,
    pub location: Location,
    pub image_url: String,
}

impl NewDiagnosis {
    /// Stamps the payload into a full record.
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> DiagnosisRecord {
        DiagnosisRecord {
            id,
            user_id: self.user_id,
            email: self.email,
            phone: self.phone,
            prediction: or_unknown(&self.prediction),
            status: self.status,
            location: Location::new(
                self.location.lat,
                self.location.lng,
                &self.location.region,
                &self.location.district,
            ),
            image_url: self.image_url,
            created_at,
        }
    }
}

/// A (district, disease) pair with the number of distinct users who reported it
/// inside the alert window. Computed per run and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCluster {
    /// The district-level grouping key.
    pub region: String,
    pub disease: String,
    pub unique_user_count: usize,
}

fn or_unknown(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}
