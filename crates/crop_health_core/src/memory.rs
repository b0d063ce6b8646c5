//! crates/crop_health_core/src/memory.rs
//!
//! An in-process implementation of the `DiagnosisLog` port. Records are kept in
//! arrival order, which is the order `find_by_district` returns them in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::alerts::group_clusters;
use crate::domain::{DiagnosisRecord, DiagnosisStatus, NewDiagnosis, RegionCluster};
use crate::ports::{DiagnosisLog, PortError, PortResult};

#[derive(Default)]
pub struct InMemoryDiagnosisLog {
    records: RwLock<Vec<DiagnosisRecord>>,
}

impl InMemoryDiagnosisLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the log with already stamped records, kept in the given order.
    pub fn from_records(records: Vec<DiagnosisRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn newest_first(mut records: Vec<DiagnosisRecord>) -> Vec<DiagnosisRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

#[async_trait]
impl DiagnosisLog for InMemoryDiagnosisLog {
    async fn insert_diagnosis(&self, diagnosis: NewDiagnosis) -> PortResult<DiagnosisRecord> {
        let record = diagnosis.into_record(Uuid::new_v4(), Utc::now());
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn delete_for_user(&self, id: Uuid, user_id: &str) -> PortResult<()> {
        let mut records = self.records.write().await;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Diagnosis {} not found", id)))?;
        if records[index].user_id != user_id {
            return Err(PortError::Unauthorized);
        }
        records.remove(index);
        Ok(())
    }

    async fn aggregate_diseased_since(&self, since: DateTime<Utc>) -> PortResult<Vec<RegionCluster>> {
        let records = self.records.read().await;
        Ok(group_clusters(records.iter(), since))
    }

    async fn find_by_district(&self, district: &str) -> PortResult<Vec<DiagnosisRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.district_key() == district)
            .cloned()
            .collect())
    }

    async fn list_diseased(&self) -> PortResult<Vec<DiagnosisRecord>> {
        let records = self.records.read().await;
        Ok(newest_first(
            records
                .iter()
                .filter(|r| r.status == DiagnosisStatus::Diseased)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_user(&self, user_id: &str) -> PortResult<Vec<DiagnosisRecord>> {
        let records = self.records.read().await;
        Ok(newest_first(
            records.iter().filter(|r| r.user_id == user_id).cloned().collect(),
        ))
    }
}
