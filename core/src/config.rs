use crate::error::{SegError, SegResult};
use serde::{Deserialize, Serialize};

/// Number of clusters in the final fit. Cluster naming assumes exactly four
/// profiles, so this is never derived from the elbow curve.
pub const FINAL_CLUSTER_COUNT: usize = 4;

/// Exact source column names. No aliasing: a record must carry these keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub customer_id: String,
    pub date:        String,
    pub item:        String,
    pub quantity:    String,
    pub unit_price:  String,
    pub total:       String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            customer_id: "Customer ID".into(),
            date:        "Date".into(),
            item:        "Item".into(),
            quantity:    "Quantity".into(),
            unit_price:  "Price".into(),
            total:       "Total".into(),
        }
    }
}

impl ColumnNames {
    /// All required columns, in source order.
    pub fn required(&self) -> [&str; 6] {
        [
            &self.customer_id,
            &self.date,
            &self.item,
            &self.quantity,
            &self.unit_price,
            &self.total,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed:               u64,
    pub elbow_k_min:        usize,
    pub elbow_k_max:        usize,
    pub n_runs:             usize,
    pub max_iterations:     u64,
    pub tolerance:          f64,
    pub cltv_trim_quantile: f64,
    pub columns:            ColumnNames,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed:               42,
            elbow_k_min:        2,
            elbow_k_max:        10,
            n_runs:             10,
            max_iterations:     300,
            tolerance:          1e-4,
            cltv_trim_quantile: 0.99,
            columns:            ColumnNames::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    /// In tests, use EngineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> SegResult<()> {
        if self.elbow_k_min < 1 {
            return Err(SegError::Config("elbow_k_min must be at least 1".into()));
        }
        if self.elbow_k_max < self.elbow_k_min {
            return Err(SegError::Config(format!(
                "elbow range is empty: {}..={}",
                self.elbow_k_min, self.elbow_k_max
            )));
        }
        if self.n_runs == 0 {
            return Err(SegError::Config("n_runs must be positive".into()));
        }
        if self.max_iterations == 0 {
            return Err(SegError::Config("max_iterations must be positive".into()));
        }
        if !(self.tolerance > 0.0) {
            return Err(SegError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.cltv_trim_quantile > 0.0 && self.cltv_trim_quantile <= 1.0) {
            return Err(SegError::Config(format!(
                "cltv_trim_quantile must be in (0, 1], got {}",
                self.cltv_trim_quantile
            )));
        }
        Ok(())
    }
}
