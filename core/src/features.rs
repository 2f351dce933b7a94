//! Clustering features: Recency, Frequency, log1p(Monetary), z-scored.

use crate::rfm::RfmRecord;
use ndarray::{Array1, Array2, Axis};

pub const FEATURE_COUNT: usize = 3;

/// Column-wise z-score scaler fitted on one dataset.
/// Uses population variance; a zero-variance column is left unscaled.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean:  Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Self {
        let cols = data.ncols();
        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(cols));
        let scale = if data.nrows() == 0 {
            Array1::ones(cols)
        } else {
            data.std_axis(Axis(0), 0.0)
                .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 })
        };
        Self { mean, scale }
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean) / &self.scale
    }
}

/// Raw clustering matrix, one row per record: [recency, frequency, ln(1 + monetary)].
pub fn raw_features(records: &[RfmRecord]) -> Array2<f64> {
    let mut data = Array2::zeros((records.len(), FEATURE_COUNT));
    for (mut row, r) in data.outer_iter_mut().zip(records) {
        row[0] = r.recency_days as f64;
        row[1] = r.frequency as f64;
        row[2] = r.monetary.ln_1p();
    }
    data
}

/// Index of the first row holding a NaN or infinite feature.
/// ln(1 + monetary) is undefined once monetary drops to -1 or below.
pub fn first_non_finite(data: &Array2<f64>) -> Option<usize> {
    data.outer_iter()
        .position(|row| row.iter().any(|x| !x.is_finite()))
}

/// Transformed, standardized features plus the scaler that produced them.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub raw:    Array2<f64>,
    pub scaled: Array2<f64>,
    pub scaler: StandardScaler,
}

pub fn build_features(records: &[RfmRecord]) -> FeatureMatrix {
    let raw = raw_features(records);
    let scaler = StandardScaler::fit(&raw);
    let scaled = scaler.transform(&raw);
    FeatureMatrix { raw, scaled, scaler }
}
