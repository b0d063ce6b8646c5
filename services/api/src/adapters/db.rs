//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DiagnosisLog` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crop_health_core::domain::{DiagnosisRecord, DiagnosisStatus, Location, NewDiagnosis, RegionCluster};
use crop_health_core::ports::{DiagnosisLog, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

const RECORD_COLUMNS: &str =
    "id, user_id, email, phone, prediction, status, lat, lng, region, district, image_url, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DiagnosisLog` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool; used on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DiagnosisRow {
    id: Uuid,
    user_id: String,
    email: Option<String>,
    phone: Option<String>,
    prediction: String,
    status: String,
    lat: Option<f64>,
    lng: Option<f64>,
    region: String,
    district: String,
    image_url: String,
    created_at: DateTime<Utc>,
}
impl DiagnosisRow {
    fn to_domain(self) -> DiagnosisRecord {
        let status = self.status.parse().unwrap_or_else(|e| {
            warn!(record_id = %self.id, error = %e, "Unrecognized status in diagnosis log");
            DiagnosisStatus::UnknownDisease
        });
        DiagnosisRecord {
            id: self.id,
            user_id: self.user_id,
            email: self.email,
            phone: self.phone,
            prediction: self.prediction,
            status,
            location: Location::new(self.lat, self.lng, &self.region, &self.district),
            image_url: self.image_url,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ClusterRow {
    region: String,
    disease: String,
    unique_user_count: i64,
}
impl ClusterRow {
    fn to_domain(self) -> RegionCluster {
        RegionCluster {
            region: self.region,
            disease: self.disease,
            unique_user_count: usize::try_from(self.unique_user_count).unwrap_or_default(),
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `DiagnosisLog` Trait Implementation
//=========================================================================================

#[async_trait]
impl DiagnosisLog for DbAdapter {
    async fn insert_diagnosis(&self, diagnosis: NewDiagnosis) -> PortResult<DiagnosisRecord> {
        let record = diagnosis.into_record(Uuid::new_v4(), Utc::now());
        let row = sqlx::query_as::<_, DiagnosisRow>(&format!(
            "INSERT INTO diagnoses (id, user_id, email, phone, prediction, status, lat, lng, region, district, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.prediction)
        .bind(record.status.as_str())
        .bind(record.location.lat)
        .bind(record.location.lng)
        .bind(&record.location.region)
        .bind(&record.location.district)
        .bind(&record.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.to_domain())
    }

    async fn delete_for_user(&self, id: Uuid, user_id: &str) -> PortResult<()> {
        let owner: Option<String> = sqlx::query_scalar("SELECT user_id FROM diagnoses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;

        match owner {
            None => Err(PortError::NotFound(format!("Diagnosis {} not found", id))),
            Some(owner) if owner != user_id => Err(PortError::Unauthorized),
            Some(_) => {
                sqlx::query("DELETE FROM diagnoses WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await
                    .map_err(unexpected)?;
                Ok(())
            }
        }
    }

    async fn aggregate_diseased_since(&self, since: DateTime<Utc>) -> PortResult<Vec<RegionCluster>> {
        // Distinct (district, disease, user) memberships first, then one row per
        // (district, disease) with the membership count.
        let rows = sqlx::query_as::<_, ClusterRow>(
            "SELECT district AS region, disease, COUNT(*) AS unique_user_count \
             FROM ( \
                 SELECT DISTINCT \
                     COALESCE(NULLIF(BTRIM(district), ''), 'Unknown') AS district, \
                     COALESCE(NULLIF(BTRIM(prediction), ''), 'Unknown') AS disease, \
                     user_id \
                 FROM diagnoses \
                 WHERE created_at >= $1 AND status = $2 AND BTRIM(user_id) <> '' \
             ) memberships \
             GROUP BY district, disease",
        )
        .bind(since)
        .bind(DiagnosisStatus::Diseased.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows.into_iter().map(ClusterRow::to_domain).collect())
    }

    async fn find_by_district(&self, district: &str) -> PortResult<Vec<DiagnosisRecord>> {
        let rows = sqlx::query_as::<_, DiagnosisRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM diagnoses \
             WHERE COALESCE(NULLIF(BTRIM(district), ''), 'Unknown') = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(district)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows.into_iter().map(DiagnosisRow::to_domain).collect())
    }

    async fn list_diseased(&self) -> PortResult<Vec<DiagnosisRecord>> {
        let rows = sqlx::query_as::<_, DiagnosisRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM diagnoses WHERE status = $1 ORDER BY created_at DESC"
        ))
        .bind(DiagnosisStatus::Diseased.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows.into_iter().map(DiagnosisRow::to_domain).collect())
    }

    async fn list_for_user(&self, user_id: &str) -> PortResult<Vec<DiagnosisRecord>> {
        let rows = sqlx::query_as::<_, DiagnosisRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM diagnoses WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows.into_iter().map(DiagnosisRow::to_domain).collect())
    }
}
