use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegError {
    #[error("Schema error at row {row}: column '{column}' {reason}")]
    Schema {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("Insufficient data for {stage}: need at least {needed}, found {found}")]
    InsufficientData {
        stage: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("Clustering error: {0}")]
    Clustering(#[from] linfa_clustering::KMeansError),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SegError {
    pub fn schema(column: &str, row: usize, reason: impl Into<String>) -> Self {
        Self::Schema {
            column: column.to_string(),
            row,
            reason: reason.into(),
        }
    }
}

pub type SegResult<T> = Result<T, SegError>;
