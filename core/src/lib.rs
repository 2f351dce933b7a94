//! Customer segmentation engine: RFM scoring, CLTV estimation and
//! k-means clustering over point-of-sale transactions.

pub mod aggregate;
pub mod cltv;
pub mod clustering;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod quantile;
pub mod rfm;
pub mod rng;
pub mod summary;
pub mod transaction;
pub mod types;
