//! The segmentation engine: one-shot batch run over raw transactions.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Transaction cleaner
//!   2. Customer aggregator    (snapshot date, RFM shape, CLTV shape)
//!   3. RFM scorer
//!   4. CLTV estimator         (+ CLTV analysis)
//!   5. Clustering engine      (consumes the RFM scorer's records)
//!   6. Summaries
//!
//! RULES:
//!   - Each stage reads ONLY the fully materialized output of earlier stages.
//!   - No stage mutates another stage's output.
//!   - All randomness flows through the RngBank seeded from EngineConfig.
//!   - Either the whole output is produced or an error is returned.

use crate::{
    aggregate::{cltv_aggregates, rfm_aggregates, snapshot_date},
    cltv::{analyze, estimate_cltv, CltvAnalysis, CltvRecord},
    clustering::{
        cluster_customers, merge_clusters, ClusterProfile, ClusterRecord, ElbowPoint,
        SegmentedCustomer,
    },
    config::EngineConfig,
    error::{SegError, SegResult},
    quantile::DegenerateQuantile,
    rfm::{score_rfm, RfmRecord},
    summary::{
        cluster_revenue_ranking, cluster_summary, dataset_overview, segment_cluster_crosstab,
        segment_summary, ClusterSummary, CrosstabCell, DatasetOverview, SegmentSummary,
    },
    transaction::{clean_records, clean_transactions, CleanTransaction, RawRecord, Transaction},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The complete derived-table set of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationOutput {
    pub seed:             u64,
    pub snapshot_date:    NaiveDateTime,
    pub transactions:     Vec<CleanTransaction>,
    pub rfm:              Vec<RfmRecord>,
    pub cltv:             Vec<CltvRecord>,
    pub clusters:         Vec<ClusterRecord>,
    pub customers:        Vec<SegmentedCustomer>,
    pub elbow:            Vec<ElbowPoint>,
    pub inertia:          f64,
    pub profiles:         Vec<ClusterProfile>,
    pub cluster_summary:  Vec<ClusterSummary>,
    /// (cluster id, total revenue), highest revenue first.
    pub cluster_revenue:  Vec<(usize, f64)>,
    pub segment_summary:  Vec<SegmentSummary>,
    pub crosstab:         Vec<CrosstabCell>,
    pub cltv_analysis:    CltvAnalysis,
    pub overview:         DatasetOverview,
    pub warnings:         Vec<DegenerateQuantile>,
}

pub struct SegmentationEngine {
    config: EngineConfig,
}

impl SegmentationEngine {
    pub fn new(config: EngineConfig) -> SegResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine with test defaults.
    pub fn build_test(seed: u64) -> SegResult<Self> {
        Self::new(EngineConfig::default_test().with_seed(seed))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the whole pipeline over untyped source rows.
    pub fn run(&self, records: &[RawRecord]) -> SegResult<SegmentationOutput> {
        // 1. Cleaner
        let cleaned = clean_records(records, &self.config.columns)?;
        self.run_cleaned(cleaned)
    }

    /// Run the whole pipeline over already typed rows.
    pub fn run_transactions(&self, transactions: &[Transaction]) -> SegResult<SegmentationOutput> {
        // 1. Cleaner
        self.run_cleaned(clean_transactions(transactions))
    }

    fn run_cleaned(&self, cleaned: Vec<CleanTransaction>) -> SegResult<SegmentationOutput> {
        if cleaned.is_empty() {
            return Err(SegError::InsufficientData {
                stage:  "cleaning",
                needed: 1,
                found:  0,
            });
        }

        // 2. Aggregator
        let snapshot = snapshot_date(&cleaned)?;
        log::debug!("engine: snapshot date {snapshot}");
        let rfm_rows = rfm_aggregates(&cleaned, snapshot);
        let cltv_rows = cltv_aggregates(&cleaned);

        // 3. RFM scorer
        let scoring = score_rfm(&rfm_rows)?;
        let mut warnings = scoring.warnings;

        // 4. CLTV estimator
        let cltv = estimate_cltv(&cltv_rows);
        let cltv_analysis = analyze(&cltv, self.config.cltv_trim_quantile).ok_or(
            SegError::InsufficientData {
                stage:  "cltv analysis",
                needed: 1,
                found:  0,
            },
        )?;
        warnings.extend(cltv_analysis.warnings.iter().cloned());

        // 5. Clustering
        let clustering = cluster_customers(&scoring.records, &self.config)?;
        let customers = merge_clusters(&scoring.records, &clustering.records);

        // 6. Summaries
        let overview = dataset_overview(&cleaned);
        let segment_summary = segment_summary(&scoring.records);
        let cluster_summary = cluster_summary(&customers);
        let cluster_revenue = cluster_revenue_ranking(&cluster_summary);
        let crosstab = segment_cluster_crosstab(&customers);

        log::info!(
            "engine: {} transactions, {} customers, {} segments, {} clusters",
            cleaned.len(),
            scoring.records.len(),
            segment_summary.len(),
            cluster_summary.len(),
        );

        Ok(SegmentationOutput {
            seed: self.config.seed,
            snapshot_date: snapshot,
            transactions: cleaned,
            rfm: scoring.records,
            cltv,
            clusters: clustering.records,
            customers,
            elbow: clustering.elbow,
            inertia: clustering.inertia,
            profiles: clustering.profiles,
            cluster_summary,
            cluster_revenue,
            segment_summary,
            crosstab,
            cltv_analysis,
            overview,
            warnings,
        })
    }
}
