//! Shared primitive types used across the entire pipeline.

/// An opaque customer identifier, normalised to a string by the cleaner.
pub type CustomerId = String;

/// A whole number of calendar days.
pub type Days = i64;

/// Days per year used by every lifetime-value conversion.
pub const DAYS_PER_YEAR: f64 = 365.0;
