//! RFM scorer: quantile scores and rule-based segment labels.
//!
//! SCORING:
//!   R_Score  5 equal-frequency buckets of recency_days, inverted (most recent = 5)
//!   F_Score  5 equal-frequency buckets of the first-occurrence RANK of frequency
//!   M_Score  3 equal-frequency buckets of monetary
//!
//! Duplicate bucket edges are collapsed, never rejected. Each collapse is
//! reported as a DegenerateQuantile and logged at warn.
//!
//! SEGMENTATION: an ordered rule chain, first match wins. The conditions
//! overlap, so the order in SEGMENT_RULES is load-bearing.

use crate::{
    aggregate::RfmAggregate,
    error::{SegError, SegResult},
    quantile::{qcut, rank_first, DegenerateQuantile, QuantileBins},
    types::{CustomerId, Days},
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RECENCY_BINS: usize = 5;
pub const FREQUENCY_BINS: usize = 5;
pub const MONETARY_BINS: usize = 3;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SegmentLabel {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "Recent Customers")]
    RecentCustomers,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Cant Lose Them")]
    CantLoseThem,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Others")]
    Others,
}

impl SegmentLabel {
    pub const ALL: [SegmentLabel; 8] = [
        Self::Champions,
        Self::LoyalCustomers,
        Self::PotentialLoyalists,
        Self::RecentCustomers,
        Self::AtRisk,
        Self::CantLoseThem,
        Self::Lost,
        Self::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Champions          => "Champions",
            Self::LoyalCustomers     => "Loyal Customers",
            Self::PotentialLoyalists => "Potential Loyalists",
            Self::RecentCustomers    => "Recent Customers",
            Self::AtRisk             => "At Risk",
            Self::CantLoseThem       => "Cant Lose Them",
            Self::Lost               => "Lost",
            Self::Others             => "Others",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three discrete scores for one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmScores {
    pub r: u8,
    pub f: u8,
    pub m: u8,
}

impl RfmScores {
    pub fn sum(&self) -> u8 {
        self.r + self.f + self.m
    }

    /// R, F, M digits concatenated, e.g. "543".
    pub fn composite(&self) -> String {
        format!("{}{}{}", self.r, self.f, self.m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id:     CustomerId,
    pub recency_days:    Days,
    pub frequency:       usize,
    pub monetary:        f64,
    pub r_score:         u8,
    pub f_score:         u8,
    pub m_score:         u8,
    pub composite_score: String,
    pub segment_sum:     u8,
    pub segment_label:   SegmentLabel,
}

impl RfmRecord {
    pub fn scores(&self) -> RfmScores {
        RfmScores {
            r: self.r_score,
            f: self.f_score,
            m: self.m_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RfmScoring {
    pub records:  Vec<RfmRecord>,
    pub warnings: Vec<DegenerateQuantile>,
}

// ── Segmentation rules ───────────────────────────────────────────────────────

pub struct SegmentRule {
    pub label:   SegmentLabel,
    pub matches: fn(&RfmScores) -> bool,
}

/// Evaluated top to bottom. Anything unmatched is Others.
pub const SEGMENT_RULES: &[SegmentRule] = &[
    SegmentRule { label: SegmentLabel::Champions,          matches: |s| s.sum() >= 10 && s.r >= 4 },
    SegmentRule { label: SegmentLabel::LoyalCustomers,     matches: |s| s.sum() >= 7 && s.r >= 3 },
    SegmentRule { label: SegmentLabel::PotentialLoyalists, matches: |s| s.f >= 3 && s.r >= 3 },
    SegmentRule { label: SegmentLabel::RecentCustomers,    matches: |s| s.r >= 4 },
    SegmentRule { label: SegmentLabel::AtRisk,             matches: |s| s.sum() >= 6 && s.r <= 2 },
    SegmentRule { label: SegmentLabel::CantLoseThem,       matches: |s| s.f >= 2 && s.r <= 2 },
    SegmentRule { label: SegmentLabel::Lost,               matches: |s| s.r <= 2 },
];

pub fn segment(scores: &RfmScores) -> SegmentLabel {
    SEGMENT_RULES
        .iter()
        .find(|rule| (rule.matches)(scores))
        .map(|rule| rule.label)
        .unwrap_or(SegmentLabel::Others)
}

// ── Scoring ──────────────────────────────────────────────────────────────────

fn bin_or_empty(values: &[f64], bins: usize, stage: &'static str) -> SegResult<QuantileBins> {
    qcut(values, bins).ok_or(SegError::InsufficientData {
        stage,
        needed: 1,
        found: 0,
    })
}

fn note_degenerate(bins: &QuantileBins, metric: &str, warnings: &mut Vec<DegenerateQuantile>) {
    if let Some(w) = bins.degenerate(metric) {
        log::warn!(
            "rfm: {metric} binning collapsed from {} to {} buckets",
            w.requested_bins,
            w.effective_bins
        );
        warnings.push(w);
    }
}

/// Score and segment every aggregate row. Output order follows input order.
pub fn score_rfm(aggregates: &[RfmAggregate]) -> SegResult<RfmScoring> {
    let recency: Vec<f64> = aggregates.iter().map(|a| a.recency_days as f64).collect();
    let frequency: Vec<f64> = aggregates.iter().map(|a| a.frequency as f64).collect();
    let monetary: Vec<f64> = aggregates.iter().map(|a| a.monetary).collect();

    let r_bins = bin_or_empty(&recency, RECENCY_BINS, "rfm scoring")?;
    let f_bins = bin_or_empty(&rank_first(&frequency), FREQUENCY_BINS, "rfm scoring")?;
    let m_bins = bin_or_empty(&monetary, MONETARY_BINS, "rfm scoring")?;

    let mut warnings = Vec::new();
    note_degenerate(&r_bins, "Recency", &mut warnings);
    note_degenerate(&f_bins, "Frequency", &mut warnings);
    note_degenerate(&m_bins, "Monetary", &mut warnings);

    let records: Vec<RfmRecord> = aggregates
        .iter()
        .enumerate()
        .map(|(i, agg)| {
            let scores = RfmScores {
                r: (RECENCY_BINS - r_bins.buckets[i]) as u8,
                f: (f_bins.buckets[i] + 1) as u8,
                m: (m_bins.buckets[i] + 1) as u8,
            };
            RfmRecord {
                customer_id:     agg.customer_id.clone(),
                recency_days:    agg.recency_days,
                frequency:       agg.frequency,
                monetary:        agg.monetary,
                r_score:         scores.r,
                f_score:         scores.f,
                m_score:         scores.m,
                composite_score: scores.composite(),
                segment_sum:     scores.sum(),
                segment_label:   segment(&scores),
            }
        })
        .collect();

    log::info!("rfm: scored {} customers", records.len());
    Ok(RfmScoring { records, warnings })
}
