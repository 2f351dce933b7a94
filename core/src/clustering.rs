//! Clustering engine: k-means over transformed RFM features.
//!
//! This stage:
//!   1. Builds [Recency, Frequency, ln(1 + Monetary)] and z-scores it
//!   2. Fits k-means for every k in the elbow range and records inertia
//!   3. Fits the final model with FINAL_CLUSTER_COUNT clusters
//!   4. Profiles each realised cluster by its members' raw RFM means
//!   5. Names each cluster against quantiles of those profile means
//!
//! The elbow curve is diagnostic output only; it never selects k.
//! Every fit draws from RngBank::for_cluster_count(k), so the elbow
//! point for the final k and the final fit agree exactly.

use crate::{
    config::{EngineConfig, FINAL_CLUSTER_COUNT},
    error::{SegError, SegResult},
    features::{build_features, first_non_finite},
    quantile::{median, quantile},
    rfm::RfmRecord,
    rng::RngBank,
    types::CustomerId,
};
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt,
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClusterName {
    #[serde(rename = "VIP Champions")]
    VipChampions,
    #[serde(rename = "Recent Big Spenders")]
    RecentBigSpenders,
    #[serde(rename = "Low Engagement")]
    LowEngagement,
    #[serde(rename = "Regular Customers")]
    RegularCustomers,
}

impl ClusterName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VipChampions      => "VIP Champions",
            Self::RecentBigSpenders => "Recent Big Spenders",
            Self::LowEngagement     => "Low Engagement",
            Self::RegularCustomers  => "Regular Customers",
        }
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    pub k:       usize,
    pub inertia: f64,
}

/// Mean raw RFM values of one realised cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id:     usize,
    pub size:           usize,
    pub recency_mean:   f64,
    pub frequency_mean: f64,
    pub monetary_mean:  f64,
    pub name:           ClusterName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub customer_id:  CustomerId,
    pub cluster_id:   usize,
    pub cluster_name: ClusterName,
}

/// A full RFM record joined with its cluster assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedCustomer {
    #[serde(flatten)]
    pub rfm:          RfmRecord,
    pub cluster_id:   usize,
    pub cluster_name: ClusterName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub k:         usize,
    pub elbow:     Vec<ElbowPoint>,
    pub inertia:   f64,
    /// Final centroids in standardized feature space, one row per cluster.
    pub centroids: Vec<Vec<f64>>,
    pub profiles:  Vec<ClusterProfile>,
    pub records:   Vec<ClusterRecord>,
}

// ── Fitting ──────────────────────────────────────────────────────────────────

struct KMeansFit {
    labels:    Array1<usize>,
    centroids: Array2<f64>,
    inertia:   f64,
}

fn fit_kmeans(
    features: &Array2<f64>,
    k: usize,
    config: &EngineConfig,
    rng_bank: &RngBank,
) -> SegResult<KMeansFit> {
    let dataset = DatasetBase::from(features.clone());
    let model = KMeans::<f64, L2Dist>::params_with(k, rng_bank.for_cluster_count(k), L2Dist)
        .n_runs(config.n_runs)
        .max_n_iterations(config.max_iterations)
        .tolerance(config.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(features);
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(features, &labels, &centroids);

    Ok(KMeansFit {
        labels,
        centroids,
        inertia,
    })
}

/// Within-cluster sum of squared distances to the assigned centroid.
pub fn compute_inertia(
    features: &Array2<f64>,
    labels: &Array1<usize>,
    centroids: &Array2<f64>,
) -> f64 {
    features
        .outer_iter()
        .zip(labels.iter())
        .filter(|(_, cluster)| **cluster < centroids.nrows())
        .map(|(point, &cluster)| {
            point
                .iter()
                .zip(centroids.row(cluster).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .sum()
}

/// Number of distinct feature vectors. k-means cannot seed more
/// centroids than this.
pub fn distinct_points(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        .map(|row| row.iter().map(|x| x.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

/// Inertia for every k in the configured range, skipping k above the
/// number of distinct customers.
pub fn elbow_curve(
    features: &Array2<f64>,
    config: &EngineConfig,
    rng_bank: &RngBank,
) -> SegResult<Vec<ElbowPoint>> {
    let n = distinct_points(features);
    let mut curve = Vec::new();
    for k in config.elbow_k_min..=config.elbow_k_max {
        if k > n {
            log::debug!("clustering: elbow skips k={k} with only {n} distinct customers");
            continue;
        }
        let fit = fit_kmeans(features, k, config, rng_bank)?;
        log::debug!("clustering: elbow k={k} inertia={:.4}", fit.inertia);
        curve.push(ElbowPoint {
            k,
            inertia: fit.inertia,
        });
    }
    Ok(curve)
}

// ── Naming ───────────────────────────────────────────────────────────────────

struct ProfileMeans {
    cluster_id: usize,
    size:       usize,
    recency:    f64,
    frequency:  f64,
    monetary:   f64,
}

fn profile_means(records: &[RfmRecord], labels: &Array1<usize>) -> Vec<ProfileMeans> {
    let mut sums: HashMap<usize, (usize, f64, f64, f64)> = HashMap::new();
    for (r, &cluster) in records.iter().zip(labels.iter()) {
        let entry = sums.entry(cluster).or_insert((0, 0.0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += r.recency_days as f64;
        entry.2 += r.frequency as f64;
        entry.3 += r.monetary;
    }
    let mut profiles: Vec<ProfileMeans> = sums
        .into_iter()
        .map(|(cluster_id, (size, rec, freq, mon))| ProfileMeans {
            cluster_id,
            size,
            recency:   rec / size as f64,
            frequency: freq / size as f64,
            monetary:  mon / size as f64,
        })
        .collect();
    profiles.sort_by_key(|p| p.cluster_id);
    profiles
}

/// Thresholds taken over the per-cluster means, not over customers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamingThresholds {
    pub frequency_p25: f64,
    pub frequency_p75: f64,
    pub recency_p25:   f64,
    pub monetary_p25:  f64,
    pub monetary_p50:  f64,
    pub monetary_p75:  f64,
}

impl NamingThresholds {
    /// None when there are no profiles.
    pub fn from_means(recency: &[f64], frequency: &[f64], monetary: &[f64]) -> Option<Self> {
        Some(Self {
            frequency_p25: quantile(frequency, 0.25)?,
            frequency_p75: quantile(frequency, 0.75)?,
            recency_p25:   quantile(recency, 0.25)?,
            monetary_p25:  quantile(monetary, 0.25)?,
            monetary_p50:  median(monetary)?,
            monetary_p75:  quantile(monetary, 0.75)?,
        })
    }

    /// First match wins.
    pub fn name(&self, recency: f64, frequency: f64, monetary: f64) -> ClusterName {
        if frequency > self.frequency_p75 && monetary > self.monetary_p75 {
            ClusterName::VipChampions
        } else if recency < self.recency_p25 && monetary > self.monetary_p50 {
            ClusterName::RecentBigSpenders
        } else if frequency <= self.frequency_p25 && monetary <= self.monetary_p25 {
            ClusterName::LowEngagement
        } else {
            ClusterName::RegularCustomers
        }
    }
}

fn name_profiles(means: Vec<ProfileMeans>) -> Vec<ClusterProfile> {
    let recency: Vec<f64> = means.iter().map(|p| p.recency).collect();
    let frequency: Vec<f64> = means.iter().map(|p| p.frequency).collect();
    let monetary: Vec<f64> = means.iter().map(|p| p.monetary).collect();
    let Some(thresholds) = NamingThresholds::from_means(&recency, &frequency, &monetary) else {
        return Vec::new();
    };

    means
        .into_iter()
        .map(|p| {
            let name = thresholds.name(p.recency, p.frequency, p.monetary);
            log::debug!(
                "clustering: cluster {} ({} customers) R={:.1} F={:.1} M={:.2} -> {name}",
                p.cluster_id,
                p.size,
                p.recency,
                p.frequency,
                p.monetary
            );
            ClusterProfile {
                cluster_id:     p.cluster_id,
                size:           p.size,
                recency_mean:   p.recency,
                frequency_mean: p.frequency,
                monetary_mean:  p.monetary,
                name,
            }
        })
        .collect()
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Elbow diagnostic, final fit and naming over scored RFM records.
/// Fails with InsufficientData when there are fewer distinct customers
/// than clusters, and with Schema on the total column when a customer's
/// monetary sum has no log feature. `row` then indexes `records`.
pub fn cluster_customers(records: &[RfmRecord], config: &EngineConfig) -> SegResult<ClusteringResult> {
    let k = FINAL_CLUSTER_COUNT;
    if records.len() < k {
        return Err(SegError::InsufficientData {
            stage:  "clustering",
            needed: k,
            found:  records.len(),
        });
    }

    let rng_bank = RngBank::new(config.seed);
    let features = build_features(records);
    if let Some(i) = first_non_finite(&features.raw) {
        return Err(SegError::schema(
            &config.columns.total,
            i,
            format!(
                "sums to {} for customer {}, which has no ln(1 + monetary) feature",
                records[i].monetary, records[i].customer_id
            ),
        ));
    }
    let distinct = distinct_points(&features.scaled);
    if distinct < k {
        return Err(SegError::InsufficientData {
            stage:  "clustering",
            needed: k,
            found:  distinct,
        });
    }

    let elbow = elbow_curve(&features.scaled, config, &rng_bank)?;
    let fit = fit_kmeans(&features.scaled, k, config, &rng_bank)?;
    log::info!("clustering: k={k} inertia={:.4}", fit.inertia);

    let profiles = name_profiles(profile_means(records, &fit.labels));
    let names: HashMap<usize, ClusterName> =
        profiles.iter().map(|p| (p.cluster_id, p.name)).collect();

    let assignments = records
        .iter()
        .zip(fit.labels.iter())
        .map(|(r, &cluster_id)| {
            let cluster_name = names.get(&cluster_id).copied().ok_or_else(|| {
                SegError::Other(anyhow::anyhow!("cluster {cluster_id} has no profile"))
            })?;
            Ok(ClusterRecord {
                customer_id: r.customer_id.clone(),
                cluster_id,
                cluster_name,
            })
        })
        .collect::<SegResult<Vec<_>>>()?;

    Ok(ClusteringResult {
        k,
        elbow,
        inertia: fit.inertia,
        centroids: fit.centroids.outer_iter().map(|row| row.to_vec()).collect(),
        profiles,
        records: assignments,
    })
}

/// Join cluster assignments onto RFM records by customer id.
pub fn merge_clusters(rfm: &[RfmRecord], clusters: &[ClusterRecord]) -> Vec<SegmentedCustomer> {
    let by_customer: HashMap<&str, &ClusterRecord> = clusters
        .iter()
        .map(|c| (c.customer_id.as_str(), c))
        .collect();
    rfm.iter()
        .filter_map(|r| {
            let c = by_customer.get(r.customer_id.as_str())?;
            Some(SegmentedCustomer {
                rfm:          r.clone(),
                cluster_id:   c.cluster_id,
                cluster_name: c.cluster_name,
            })
        })
        .collect()
}
