use crate::domain::RegionCluster;

/// Minimum distinct reporters before a cluster raises an alert.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Keeps the clusters whose distinct-user count reaches `min_cluster_size`,
/// preserving input order.
pub fn qualifying_clusters(clusters: Vec<RegionCluster>, min_cluster_size: usize) -> Vec<RegionCluster> {
    clusters
        .into_iter()
        .filter(|c| c.unique_user_count >= min_cluster_size)
        .collect()
}
