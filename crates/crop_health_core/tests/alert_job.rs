use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crop_health_core::{
    AlertError, AlertSettings, DiagnosisLog, DiagnosisRecord, DiagnosisStatus, EmailChannel,
    InMemoryDiagnosisLog, Location, NewDiagnosis, NotificationDispatcher, OutbreakAlert, PortError,
    PortResult, RegionCluster, RegionalAlertJob, SmsChannel,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// Test doubles
//=========================================================================================

#[derive(Default)]
struct RecordingEmail {
    fail_for: Vec<String>,
    attempts: Mutex<Vec<(String, OutbreakAlert)>>,
}

impl RecordingEmail {
    fn failing_for(addresses: &[&str]) -> Self {
        Self {
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    async fn delivered_to(&self) -> Vec<String> {
        let mut delivered: Vec<String> = self
            .attempts
            .lock()
            .await
            .iter()
            .filter(|(address, _)| !self.fail_for.contains(address))
            .map(|(address, _)| address.clone())
            .collect();
        delivered.sort();
        delivered
    }
}

#[async_trait]
impl EmailChannel for RecordingEmail {
    async fn send_outbreak_alert(&self, address: &str, alert: &OutbreakAlert) -> PortResult<()> {
        self.attempts.lock().await.push((address.to_string(), alert.clone()));
        if self.fail_for.iter().any(|f| f == address) {
            return Err(PortError::Unexpected(format!("provider rejected {address}")));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSms {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl SmsChannel for RecordingSms {
    async fn send_outbreak_alert(&self, phone: &str, _alert: &OutbreakAlert) -> PortResult<()> {
        self.sent.lock().await.push(phone.to_string());
        Ok(())
    }
}

struct BrokenLog;

#[async_trait]
impl DiagnosisLog for BrokenLog {
    async fn insert_diagnosis(&self, _diagnosis: NewDiagnosis) -> PortResult<DiagnosisRecord> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
    async fn delete_for_user(&self, _id: Uuid, _user_id: &str) -> PortResult<()> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
    async fn aggregate_diseased_since(&self, _since: DateTime<Utc>) -> PortResult<Vec<RegionCluster>> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
    async fn find_by_district(&self, _district: &str) -> PortResult<Vec<DiagnosisRecord>> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
    async fn list_diseased(&self) -> PortResult<Vec<DiagnosisRecord>> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
    async fn list_for_user(&self, _user_id: &str) -> PortResult<Vec<DiagnosisRecord>> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
}

fn diagnosis(
    user: &str,
    email: Option<&str>,
    district: &str,
    disease: &str,
    status: DiagnosisStatus,
    created_at: DateTime<Utc>,
) -> DiagnosisRecord {
    DiagnosisRecord {
        id: Uuid::new_v4(),
        user_id: user.to_string(),
        email: email.map(str::to_string),
        phone: None,
        prediction: disease.to_string(),
        status,
        location: Location::new(Some(23.4), Some(88.5), "West Bengal", district),
        image_url: format!("https://img.example/{user}.jpg"),
        created_at,
    }
}

fn job(log: InMemoryDiagnosisLog, email: Arc<RecordingEmail>) -> RegionalAlertJob {
    RegionalAlertJob::new(
        Arc::new(log),
        NotificationDispatcher::new(email, 4),
        AlertSettings::default(),
    )
}

//=========================================================================================
// Scenarios
//=========================================================================================

#[tokio::test]
async fn reporter_outside_the_window_in_another_district_is_not_alerted() {
    let now = Utc::now();
    let log = InMemoryDiagnosisLog::from_records(vec![
        diagnosis("user_c", Some("c@farm.test"), "Malda", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(30)),
        diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(2)),
        diagnosis("user_b", Some("b@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(5)),
    ]);
    let email = Arc::new(RecordingEmail::default());

    let summary = job(log, email.clone()).run_once(now).await.unwrap();

    assert_eq!(summary.clusters_found, 1);
    assert_eq!(summary.clusters_alerted, 1);
    assert_eq!(email.delivered_to().await, vec!["a@farm.test", "b@farm.test"]);
    let attempts = email.attempts.lock().await;
    assert!(attempts
        .iter()
        .all(|(_, alert)| alert == &OutbreakAlert::new("Nadia", "Blight")));
}

#[tokio::test]
async fn stale_reporter_in_the_same_district_does_not_count_toward_the_cluster() {
    let now = Utc::now();
    let log = InMemoryDiagnosisLog::from_records(vec![
        diagnosis("user_c", Some("c@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(30)),
        diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(2)),
        diagnosis("user_b", Some("b@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(5)),
    ]);
    let clusters = log.aggregate_diseased_since(now - Duration::hours(24)).await.unwrap();
    assert_eq!(
        clusters,
        vec![RegionCluster {
            region: "Nadia".to_string(),
            disease: "Blight".to_string(),
            unique_user_count: 2,
        }]
    );

    // Fan-out matches on district alone, so the stale reporter is still notified.
    let email = Arc::new(RecordingEmail::default());
    job(log, email.clone()).run_once(now).await.unwrap();
    assert_eq!(
        email.delivered_to().await,
        vec!["a@farm.test", "b@farm.test", "c@farm.test"]
    );
}

#[tokio::test]
async fn below_threshold_sends_nothing() {
    let now = Utc::now();
    let log = InMemoryDiagnosisLog::from_records(vec![
        diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now),
        diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now),
        diagnosis("user_b", Some("b@farm.test"), "Nadia", "Blight", DiagnosisStatus::Healthy, now),
    ]);
    let email = Arc::new(RecordingEmail::default());

    let summary = job(log, email.clone()).run_once(now).await.unwrap();

    assert_eq!(summary.clusters_found, 1);
    assert_eq!(summary.clusters_qualifying, 0);
    assert!(email.attempts.lock().await.is_empty());
}

#[tokio::test]
async fn repeated_address_is_emailed_once_per_run() {
    let now = Utc::now();
    let mut records: Vec<_> = (0..5)
        .map(|_| diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now))
        .collect();
    records.push(diagnosis("user_b", None, "Nadia", "Blight", DiagnosisStatus::Diseased, now));
    let email = Arc::new(RecordingEmail::default());

    let summary = job(InMemoryDiagnosisLog::from_records(records), email.clone())
        .run_once(now)
        .await
        .unwrap();

    assert_eq!(email.attempts.lock().await.len(), 1);
    assert_eq!(summary.emails_sent, 1);
    assert_eq!(summary.duplicates_suppressed, 4);
    assert_eq!(summary.recipients_missing_email, 1);
}

#[tokio::test]
async fn dedup_does_not_carry_over_between_runs() {
    let now = Utc::now();
    let log = InMemoryDiagnosisLog::from_records(vec![
        diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now),
        diagnosis("user_b", Some("b@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now),
    ]);
    let email = Arc::new(RecordingEmail::default());
    let job = job(log, email.clone());

    job.run_once(now).await.unwrap();
    job.run_once(now + Duration::hours(6)).await.unwrap();

    assert_eq!(email.attempts.lock().await.len(), 4);
}

#[tokio::test]
async fn second_of_five_failing_leaves_the_other_four_delivered() {
    let now = Utc::now();
    let records: Vec<_> = (1..=5)
        .map(|i| {
            diagnosis(
                &format!("user_{i}"),
                Some(&format!("farmer{i}@farm.test")),
                "Nadia",
                "Blight",
                DiagnosisStatus::Diseased,
                now,
            )
        })
        .collect();
    let email = Arc::new(RecordingEmail::failing_for(&["farmer2@farm.test"]));

    let summary = job(InMemoryDiagnosisLog::from_records(records), email.clone())
        .run_once(now)
        .await
        .expect("run completes despite a failed send");

    assert_eq!(email.attempts.lock().await.len(), 5);
    assert_eq!(summary.emails_sent, 4);
    assert_eq!(summary.emails_failed, 1);
    assert_eq!(
        email.delivered_to().await,
        vec!["farmer1@farm.test", "farmer3@farm.test", "farmer4@farm.test", "farmer5@farm.test"]
    );
}

#[tokio::test]
async fn aggregation_failure_aborts_the_run() {
    let email = Arc::new(RecordingEmail::default());
    let job = RegionalAlertJob::new(
        Arc::new(BrokenLog),
        NotificationDispatcher::new(email.clone(), 4),
        AlertSettings::default(),
    );

    let result = job.run_once(Utc::now()).await;

    assert!(matches!(result, Err(AlertError::Aggregation(_))));
    assert!(email.attempts.lock().await.is_empty());
}

#[tokio::test]
async fn sms_channel_receives_normalized_numbers_once() {
    let now = Utc::now();
    let mut a = diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now);
    a.phone = Some("09876543210".to_string());
    let mut b = diagnosis("user_b", Some("b@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now);
    b.phone = Some("98765 43210".to_string());
    let email = Arc::new(RecordingEmail::default());
    let sms = Arc::new(RecordingSms::default());

    let job = RegionalAlertJob::new(
        Arc::new(InMemoryDiagnosisLog::from_records(vec![a, b])),
        NotificationDispatcher::new(email.clone(), 4).with_sms(sms.clone()),
        AlertSettings::default(),
    );
    let summary = job.run_once(now).await.unwrap();

    assert_eq!(summary.emails_sent, 2);
    assert_eq!(summary.sms_sent, 1);
    assert_eq!(*sms.sent.lock().await, vec!["+9876543210".to_string()]);
}

#[tokio::test]
async fn custom_window_and_threshold_are_honoured() {
    let now = Utc::now();
    let log = InMemoryDiagnosisLog::from_records(vec![
        diagnosis("user_a", Some("a@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(40)),
        diagnosis("user_b", Some("b@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(1)),
        diagnosis("user_c", Some("c@farm.test"), "Nadia", "Blight", DiagnosisStatus::Diseased, now - Duration::hours(1)),
    ]);
    let email = Arc::new(RecordingEmail::default());
    let settings = AlertSettings {
        window: Duration::hours(48),
        min_cluster_size: 3,
        ..AlertSettings::default()
    };

    let job = RegionalAlertJob::new(Arc::new(log), NotificationDispatcher::new(email.clone(), 2), settings);
    let summary = job.run_once(now).await.unwrap();

    assert_eq!(summary.clusters_qualifying, 1);
    assert_eq!(summary.emails_sent, 3);
}
