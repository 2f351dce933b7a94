//! Read-only group summaries over the derived tables.

use crate::{
    clustering::{ClusterName, SegmentedCustomer},
    rfm::{RfmRecord, SegmentLabel},
    transaction::CleanTransaction,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_transactions: usize,
    pub unique_customers:   usize,
    pub first_date:         Option<NaiveDateTime>,
    pub last_date:          Option<NaiveDateTime>,
    pub total_revenue:      f64,
}

pub fn dataset_overview(transactions: &[CleanTransaction]) -> DatasetOverview {
    let customers: HashSet<&str> = transactions.iter().map(|t| t.customer_id.as_str()).collect();
    DatasetOverview {
        total_transactions: transactions.len(),
        unique_customers:   customers.len(),
        first_date:         transactions.iter().map(|t| t.date).min(),
        last_date:          transactions.iter().map(|t| t.date).max(),
        total_revenue:      transactions.iter().map(|t| t.total).sum(),
    }
}

/// Mean R/F/M and revenue for one group of customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count:         usize,
    pub avg_recency:   f64,
    pub avg_frequency: f64,
    pub avg_monetary:  f64,
    pub total_revenue: f64,
}

#[derive(Debug, Default)]
struct StatsAccumulator {
    count:     usize,
    recency:   f64,
    frequency: f64,
    monetary:  f64,
}

impl StatsAccumulator {
    fn add(&mut self, recency: f64, frequency: f64, monetary: f64) {
        self.count += 1;
        self.recency += recency;
        self.frequency += frequency;
        self.monetary += monetary;
    }

    fn finish(self) -> GroupStats {
        let n = self.count as f64;
        GroupStats {
            count:         self.count,
            avg_recency:   self.recency / n,
            avg_frequency: self.frequency / n,
            avg_monetary:  self.monetary / n,
            total_revenue: self.monetary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: SegmentLabel,
    pub stats:   GroupStats,
}

/// One row per segment present, in segment rule order.
pub fn segment_summary(records: &[RfmRecord]) -> Vec<SegmentSummary> {
    let mut groups: BTreeMap<SegmentLabel, StatsAccumulator> = BTreeMap::new();
    for r in records {
        groups
            .entry(r.segment_label)
            .or_default()
            .add(r.recency_days as f64, r.frequency as f64, r.monetary);
    }
    groups
        .into_iter()
        .map(|(segment, acc)| SegmentSummary {
            segment,
            stats: acc.finish(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id:   usize,
    pub cluster_name: ClusterName,
    pub stats:        GroupStats,
}

/// One row per (cluster id, name), ordered by cluster id.
pub fn cluster_summary(customers: &[SegmentedCustomer]) -> Vec<ClusterSummary> {
    let mut groups: BTreeMap<(usize, ClusterName), StatsAccumulator> = BTreeMap::new();
    for c in customers {
        groups
            .entry((c.cluster_id, c.cluster_name))
            .or_default()
            .add(c.rfm.recency_days as f64, c.rfm.frequency as f64, c.rfm.monetary);
    }
    groups
        .into_iter()
        .map(|((cluster_id, cluster_name), acc)| ClusterSummary {
            cluster_id,
            cluster_name,
            stats: acc.finish(),
        })
        .collect()
}

/// Cluster ids by total revenue, highest first.
pub fn cluster_revenue_ranking(summaries: &[ClusterSummary]) -> Vec<(usize, f64)> {
    let mut ranking: Vec<(usize, f64)> = summaries
        .iter()
        .map(|s| (s.cluster_id, s.stats.total_revenue))
        .collect();
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranking
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosstabCell {
    pub segment:    SegmentLabel,
    pub cluster_id: usize,
    pub count:      usize,
}

/// Customer counts for every (segment, cluster) pair that occurs.
pub fn segment_cluster_crosstab(customers: &[SegmentedCustomer]) -> Vec<CrosstabCell> {
    let mut counts: BTreeMap<(SegmentLabel, usize), usize> = BTreeMap::new();
    for c in customers {
        *counts.entry((c.rfm.segment_label, c.cluster_id)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((segment, cluster_id), count)| CrosstabCell {
            segment,
            cluster_id,
            count,
        })
        .collect()
}
