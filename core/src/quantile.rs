//! Quantiles and equal-frequency binning.
//!
//! Quantiles use linear interpolation between closest ranks.
//! Binning assigns each value to the bucket (e[i], e[i+1]] with the lowest
//! edge included in the first bucket. Duplicate edges are collapsed rather
//! than rejected, so skewed data yields fewer effective buckets.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Observable record of a binning that lost buckets to duplicate edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenerateQuantile {
    pub metric:         String,
    pub requested_bins: usize,
    pub effective_bins: usize,
}

/// Result of an equal-frequency binning.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    /// Deduplicated, ascending bin edges.
    pub edges:          Vec<f64>,
    pub requested_bins: usize,
    /// Zero-based bucket per input value, in input order.
    pub buckets:        Vec<usize>,
}

impl QuantileBins {
    pub fn effective_bins(&self) -> usize {
        self.edges.len().saturating_sub(1).max(1)
    }

    pub fn is_degenerate(&self) -> bool {
        self.effective_bins() < self.requested_bins
    }

    pub fn degenerate(&self, metric: &str) -> Option<DegenerateQuantile> {
        self.is_degenerate().then(|| DegenerateQuantile {
            metric:         metric.to_string(),
            requested_bins: self.requested_bins,
            effective_bins: self.effective_bins(),
        })
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// Quantile `q` in [0, 1] of an ascending-sorted slice.
/// Returns None on an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = position.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    Some(lerp(sorted[lo], sorted[hi], position - lo as f64))
}

/// Quantile `q` of an unsorted sequence.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let sorted = sorted_copy(values);
    quantile_sorted(&sorted, q)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Rank values 1..=n; ties are ranked in order of first appearance.
pub fn rank_first(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable, so equal values keep their input order.
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    let mut ranks = vec![0.0; values.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = (rank + 1) as f64;
    }
    ranks
}

/// Split `values` into `bins` equal-frequency buckets.
/// Returns None if `values` is empty or `bins` is zero.
pub fn qcut(values: &[f64], bins: usize) -> Option<QuantileBins> {
    if values.is_empty() || bins == 0 {
        return None;
    }
    let sorted = sorted_copy(values);
    let mut edges: Vec<f64> = (0..=bins)
        .filter_map(|i| quantile_sorted(&sorted, i as f64 / bins as f64))
        .collect();
    edges.dedup();

    let effective = edges.len().saturating_sub(1).max(1);
    let upper = if edges.len() > 1 { &edges[1..] } else { &edges[..] };
    let buckets = values
        .iter()
        .map(|x| upper.partition_point(|e| e < x).min(effective - 1))
        .collect();

    Some(QuantileBins {
        edges,
        requested_bins: bins,
        buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert!((quantile(&v, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((median(&v).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn rank_first_breaks_ties_by_position() {
        let ranks = rank_first(&[3.0, 1.0, 3.0, 1.0]);
        assert_eq!(ranks, vec![3.0, 1.0, 4.0, 2.0]);
    }

    #[test]
    fn qcut_three_spread_values_land_in_distinct_buckets() {
        let bins = qcut(&[10.0, 100.0, 1000.0], 3).unwrap();
        assert_eq!(bins.buckets, vec![0, 1, 2]);
        assert!(!bins.is_degenerate());
    }

    #[test]
    fn qcut_lowest_edge_is_included() {
        let bins = qcut(&[5.0, 6.0, 7.0, 8.0, 9.0], 5).unwrap();
        assert_eq!(bins.buckets, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn qcut_collapses_duplicate_edges() {
        let bins = qcut(&[1.0, 1.0, 1.0, 2.0, 50.0], 3).unwrap();
        assert_eq!(bins.effective_bins(), 2);
        assert!(bins.is_degenerate());
        assert_eq!(bins.buckets, vec![0, 0, 0, 1, 1]);
        let warning = bins.degenerate("Monetary").unwrap();
        assert_eq!(warning.requested_bins, 3);
        assert_eq!(warning.effective_bins, 2);
    }

    #[test]
    fn qcut_all_equal_values_share_one_bucket() {
        let bins = qcut(&[7.0, 7.0, 7.0], 5).unwrap();
        assert_eq!(bins.effective_bins(), 1);
        assert_eq!(bins.buckets, vec![0, 0, 0]);
    }
}
