//! CLTV estimator: formulaic lifetime value per customer.
//!
//!   avg_order_value            = total_revenue / num_purchases
//!   purchase_frequency_per_year = num_purchases / (lifespan_days + 1) * 365
//!   lifespan_years             = (lifespan_days + 1) / 365
//!   cltv                       = aov * frequency_per_year * lifespan_years
//!
//! The +1 day offset keeps single-transaction customers finite.
//! The product is evaluated term by term; do not fold it into total_revenue.

use crate::{
    aggregate::CltvAggregate,
    quantile::{median, qcut, quantile, DegenerateQuantile},
    types::{CustomerId, DAYS_PER_YEAR},
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const VALUE_TIER_BINS: usize = 4;
pub const PARETO_HEAD_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvRecord {
    pub customer_id:                 CustomerId,
    pub avg_order_value:             f64,
    pub purchase_frequency_per_year: f64,
    pub lifespan_years:              f64,
    pub cltv:                        f64,
}

pub fn estimate(agg: &CltvAggregate) -> CltvRecord {
    let purchases = agg.num_purchases as f64;
    let lifespan_plus_one = agg.lifespan_days as f64 + 1.0;

    let avg_order_value = agg.total_revenue / purchases;
    let purchase_frequency_per_year = purchases / lifespan_plus_one * DAYS_PER_YEAR;
    let lifespan_years = lifespan_plus_one / DAYS_PER_YEAR;
    let cltv = avg_order_value * purchase_frequency_per_year * lifespan_years;

    CltvRecord {
        customer_id: agg.customer_id.clone(),
        avg_order_value,
        purchase_frequency_per_year,
        lifespan_years,
        cltv,
    }
}

pub fn estimate_cltv(aggregates: &[CltvAggregate]) -> Vec<CltvRecord> {
    let records: Vec<CltvRecord> = aggregates.iter().map(estimate).collect();
    log::info!("cltv: estimated {} customers", records.len());
    records
}

// ── Analysis ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueTier {
    #[serde(rename = "Low Value")]
    Low,
    #[serde(rename = "Medium Value")]
    Medium,
    #[serde(rename = "High Value")]
    High,
    #[serde(rename = "Top Value")]
    Top,
}

impl ValueTier {
    pub const ALL: [ValueTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Top];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low    => "Low Value",
            Self::Medium => "Medium Value",
            Self::High   => "High Value",
            Self::Top    => "Top Value",
        }
    }
}

impl fmt::Display for ValueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub customer_id:        CustomerId,
    pub cltv:               f64,
    pub customer_percent:   f64,
    pub cumulative_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredCustomer {
    pub customer_id: CustomerId,
    pub cltv:        f64,
    pub tier:        ValueTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvAnalysis {
    /// CLTV at the trim quantile; customers above it are excluded below.
    pub trim_threshold: f64,
    pub trimmed_count:  usize,
    pub total_cltv:     f64,
    pub mean_cltv:      f64,
    pub median_cltv:    f64,
    /// Highest CLTV first.
    pub pareto:         Vec<ParetoPoint>,
    /// Share of trimmed CLTV held by the top 20% of customers, in percent.
    pub top_20_share:   f64,
    pub tiers:          Vec<TieredCustomer>,
    pub tier_counts:    Vec<(ValueTier, usize)>,
    pub warnings:       Vec<DegenerateQuantile>,
}

/// Trim outliers above `trim_quantile` and derive the Pareto curve and
/// value tiers over what remains. None when `records` is empty.
pub fn analyze(records: &[CltvRecord], trim_quantile: f64) -> Option<CltvAnalysis> {
    let values: Vec<f64> = records.iter().map(|r| r.cltv).collect();
    let trim_threshold = quantile(&values, trim_quantile)?;

    let trimmed: Vec<&CltvRecord> = records.iter().filter(|r| r.cltv <= trim_threshold).collect();
    let trimmed_values: Vec<f64> = trimmed.iter().map(|r| r.cltv).collect();
    let n = trimmed.len();

    let total_cltv: f64 = trimmed_values.iter().sum();
    let mean_cltv = total_cltv / n as f64;
    let median_cltv = median(&trimmed_values)?;

    let mut ranked = trimmed.clone();
    ranked.sort_by(|a, b| b.cltv.total_cmp(&a.cltv));
    let mut running = 0.0;
    let pareto: Vec<ParetoPoint> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| {
            running += r.cltv;
            ParetoPoint {
                customer_id:        r.customer_id.clone(),
                cltv:               r.cltv,
                customer_percent:   (i + 1) as f64 / n as f64 * 100.0,
                cumulative_percent: if total_cltv != 0.0 { running / total_cltv * 100.0 } else { 0.0 },
            }
        })
        .collect();
    let head = ((n as f64 * PARETO_HEAD_FRACTION) as usize).min(n - 1);
    let top_20_share = pareto[head].cumulative_percent;

    let mut warnings = Vec::new();
    let bins = qcut(&trimmed_values, VALUE_TIER_BINS)?;
    if let Some(w) = bins.degenerate("CLTV") {
        log::warn!(
            "cltv: value tiers collapsed from {} to {} buckets",
            w.requested_bins,
            w.effective_bins
        );
        warnings.push(w);
    }
    let tiers: Vec<TieredCustomer> = trimmed
        .iter()
        .zip(&bins.buckets)
        .map(|(r, &bucket)| TieredCustomer {
            customer_id: r.customer_id.clone(),
            cltv:        r.cltv,
            tier:        ValueTier::ALL[bucket],
        })
        .collect();
    let tier_counts = ValueTier::ALL
        .iter()
        .map(|&tier| (tier, tiers.iter().filter(|t| t.tier == tier).count()))
        .filter(|(_, count)| *count > 0)
        .collect();

    log::debug!(
        "cltv: trimmed {} of {} at {trim_threshold:.2}, top 20% hold {top_20_share:.1}%",
        records.len() - n,
        records.len()
    );

    Some(CltvAnalysis {
        trim_threshold,
        trimmed_count: n,
        total_cltv,
        mean_cltv,
        median_cltv,
        pareto,
        top_20_share,
        tiers,
        tier_counts,
        warnings,
    })
}
