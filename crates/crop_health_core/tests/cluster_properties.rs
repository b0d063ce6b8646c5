use chrono::{Duration, TimeZone, Utc};
use crop_health_core::alerts::{group_clusters, normalize_phone, qualifying_clusters};
use crop_health_core::{DiagnosisRecord, DiagnosisStatus, Location};
use proptest::prelude::*;
use proptest::test_runner::Config;
use std::collections::HashSet;
use uuid::Uuid;

const USERS: &[&str] = &["u1", "u2", "u3", "u4", "u5"];
const DISTRICTS: &[&str] = &["Nadia", "Hooghly", "Unknown", ""];
const DISEASES: &[&str] = &["Blight", "Rust", "Leaf Spot"];

fn status_strategy() -> impl Strategy<Value = DiagnosisStatus> {
    prop_oneof![
        Just(DiagnosisStatus::Healthy),
        Just(DiagnosisStatus::Diseased),
        Just(DiagnosisStatus::UnknownDisease),
    ]
}

fn record_strategy() -> impl Strategy<Value = DiagnosisRecord> {
    (
        prop::sample::select(USERS),
        prop::sample::select(DISTRICTS),
        prop::sample::select(DISEASES),
        status_strategy(),
        0_i64..48,
    )
        .prop_map(|(user, district, disease, status, age_hours)| {
            let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
            DiagnosisRecord {
                id: Uuid::nil(),
                user_id: user.to_string(),
                email: None,
                phone: None,
                prediction: disease.to_string(),
                status,
                location: Location {
                    lat: None,
                    lng: None,
                    region: "West Bengal".to_string(),
                    district: district.to_string(),
                },
                image_url: String::new(),
                created_at: now - Duration::hours(age_hours),
            }
        })
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn unique_user_count_matches_distinct_reporters(
        records in prop::collection::vec(record_strategy(), 0..60)
    ) {
        let since = Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap();
        let clusters = group_clusters(&records, since);

        for cluster in &clusters {
            let expected: HashSet<&str> = records
                .iter()
                .filter(|r| r.status == DiagnosisStatus::Diseased && r.created_at >= since)
                .filter(|r| r.district_key() == cluster.region && r.disease_key() == cluster.disease)
                .map(|r| r.user_id.as_str())
                .collect();
            prop_assert_eq!(cluster.unique_user_count, expected.len());
            prop_assert!(cluster.unique_user_count > 0);
        }

        let recent_pairs: HashSet<(String, String)> = records
            .iter()
            .filter(|r| r.status == DiagnosisStatus::Diseased && r.created_at >= since)
            .map(|r| (r.district_key(), r.disease_key()))
            .collect();
        prop_assert_eq!(clusters.len(), recent_pairs.len());
    }

    #[test]
    fn raising_the_threshold_never_adds_clusters(
        records in prop::collection::vec(record_strategy(), 0..60),
        low in 0_usize..6,
        bump in 0_usize..6,
    ) {
        let since = Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap();
        let clusters = group_clusters(&records, since);

        let at_low = qualifying_clusters(clusters.clone(), low);
        let at_high = qualifying_clusters(clusters, low + bump);
        prop_assert!(at_high.len() <= at_low.len());
        prop_assert!(at_high.iter().all(|c| at_low.contains(c)));
    }

    #[test]
    fn phone_normalization_is_idempotent(raw in "[ 0+]{0,3}[0-9 ]{0,14}") {
        if let Some(once) = normalize_phone(&raw) {
            prop_assert!(once.starts_with('+'));
            prop_assert!(!once.contains(char::is_whitespace));
            prop_assert_eq!(normalize_phone(&once), Some(once.clone()));
        }
    }
}
