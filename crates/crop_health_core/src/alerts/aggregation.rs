//! The aggregation query over the diagnosis log.
//!
//! Records are collapsed to distinct (district, disease, user) memberships first,
//! so repeat uploads by one user count once per cluster.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{DiagnosisRecord, DiagnosisStatus, RegionCluster};

/// Groups Diseased records created at or after `since` into clusters.
///
/// Records with a blank `user_id` are skipped; other ids are compared verbatim.
/// Blank districts and predictions land in the `"Unknown"` bucket. The output is sorted by (region, disease).
pub fn group_clusters<'a, I>(records: I, since: DateTime<Utc>) -> Vec<RegionCluster>
where
    I: IntoIterator<Item = &'a DiagnosisRecord>,
{
    let memberships: BTreeSet<(String, String, &str)> = records
        .into_iter()
        .filter(|r| r.status == DiagnosisStatus::Diseased && r.created_at >= since)
        .filter(|r| !r.user_id.trim().is_empty())
        .map(|r| (r.district_key(), r.disease_key(), r.user_id.as_str()))
        .collect();

    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for (district, disease, _user) in memberships {
        *counts.entry((district, disease)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((region, disease), unique_user_count)| RegionCluster {
            region,
            disease,
            unique_user_count,
        })
        .collect()
}
