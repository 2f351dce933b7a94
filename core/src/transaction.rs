//! Transaction cleaner: raw source rows to typed, filtered transactions.
//!
//! This stage:
//!   1. Resolves every required column by exact name (no aliasing)
//!   2. Coerces quantity and unit_price on every row
//!   3. Drops rows where quantity <= 0 or unit_price <= 0
//!   4. Coerces the remaining columns of the kept rows only
//!   5. Derives total_price = quantity * unit_price on every kept row
//!
//! Output order is input order. A missing column or a malformed value
//! on a kept row aborts the whole run with SegError::Schema. Dropped
//! rows are never inspected beyond their quantity and unit_price.

use crate::{
    config::ColumnNames,
    error::{SegError, SegResult},
    types::CustomerId,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One untyped source row, keyed by column name.
pub type RawRecord = serde_json::Map<String, Value>;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A typed input row. `quantity` and `unit_price` are None when the
/// source value was missing; such rows never survive cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub date:        NaiveDateTime,
    pub item:        String,
    pub quantity:    Option<i64>,
    pub unit_price:  Option<f64>,
    pub total:       f64,
}

/// A row that passed cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanTransaction {
    pub customer_id: CustomerId,
    pub date:        NaiveDateTime,
    pub item:        String,
    pub quantity:    i64,
    pub unit_price:  f64,
    /// Line total from the source; this is what Monetary and CLTV sum.
    pub total:       f64,
    /// Diagnostic quantity * unit_price. Not used by any metric.
    pub total_price: f64,
}

// ── Parsing ──────────────────────────────────────────────────────────────────

fn required<'a>(record: &'a RawRecord, column: &str, row: usize) -> SegResult<&'a Value> {
    record
        .get(column)
        .ok_or_else(|| SegError::schema(column, row, "is missing"))
}

fn parse_customer_id(value: &Value, column: &str, row: usize) -> SegResult<CustomerId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        _ => Err(SegError::schema(column, row, format!("is not an identifier: {value}"))),
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_date_value(value: &Value, column: &str, row: usize) -> SegResult<NaiveDateTime> {
    value
        .as_str()
        .and_then(parse_date)
        .ok_or_else(|| SegError::schema(column, row, format!("is not a date: {value}")))
}

fn parse_item(value: &Value, column: &str, row: usize) -> SegResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(SegError::schema(column, row, format!("is not an item identifier: {value}"))),
    }
}

/// A finite number, or a string holding one. Null is Ok(None).
fn parse_number(value: &Value, column: &str, row: usize) -> SegResult<Option<f64>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(x) if x.is_finite() => Ok(Some(x)),
        _ => Err(SegError::schema(column, row, format!("is not numeric: {value}"))),
    }
}

fn parse_quantity(value: &Value, column: &str, row: usize) -> SegResult<Option<i64>> {
    if let Some(i) = value.as_i64() {
        return Ok(Some(i));
    }
    match parse_number(value, column, row)? {
        None => Ok(None),
        Some(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => Ok(Some(x as i64)),
        Some(x) => Err(SegError::schema(column, row, format!("is not an integer: {x}"))),
    }
}

/// The two filter columns of one record.
fn filter_keys(record: &RawRecord, columns: &ColumnNames, row: usize) -> SegResult<(Option<i64>, Option<f64>)> {
    let quantity =
        parse_quantity(required(record, &columns.quantity, row)?, &columns.quantity, row)?;
    let unit_price = parse_number(
        required(record, &columns.unit_price, row)?,
        &columns.unit_price,
        row,
    )?;
    Ok((quantity, unit_price))
}

/// A missing quantity or price compares false, like a non-positive one.
fn passes_filter(quantity: Option<i64>, unit_price: Option<f64>) -> bool {
    quantity.is_some_and(|q| q > 0) && unit_price.is_some_and(|p| p > 0.0)
}

impl Transaction {
    /// Coerce one raw record. `row` is the zero-based source row index.
    pub fn from_record(record: &RawRecord, columns: &ColumnNames, row: usize) -> SegResult<Self> {
        let (quantity, unit_price) = filter_keys(record, columns, row)?;
        let customer_id = parse_customer_id(
            required(record, &columns.customer_id, row)?,
            &columns.customer_id,
            row,
        )?;
        let date = parse_date_value(required(record, &columns.date, row)?, &columns.date, row)?;
        let item = parse_item(required(record, &columns.item, row)?, &columns.item, row)?;
        let total = parse_number(required(record, &columns.total, row)?, &columns.total, row)?
            .ok_or_else(|| SegError::schema(&columns.total, row, "is null"))?;

        Ok(Self {
            customer_id,
            date,
            item,
            quantity,
            unit_price,
            total,
        })
    }

    fn into_clean(self) -> Option<CleanTransaction> {
        if !passes_filter(self.quantity, self.unit_price) {
            return None;
        }
        let quantity = self.quantity?;
        let unit_price = self.unit_price?;
        Some(CleanTransaction {
            customer_id: self.customer_id,
            date: self.date,
            item: self.item,
            quantity,
            unit_price,
            total: self.total,
            total_price: quantity as f64 * unit_price,
        })
    }
}

// ── Cleaning ─────────────────────────────────────────────────────────────────

/// Verify every required column is present on every record before any
/// value is coerced, so a missing column is reported ahead of bad values.
pub fn check_schema(records: &[RawRecord], columns: &ColumnNames) -> SegResult<()> {
    for (row, record) in records.iter().enumerate() {
        for column in columns.required() {
            if !record.contains_key(column) {
                return Err(SegError::schema(column, row, "is missing"));
            }
        }
    }
    Ok(())
}

/// Parse raw records into typed transactions without filtering.
/// Every value of every row is coerced, so this is stricter than
/// clean_records.
pub fn parse_records(records: &[RawRecord], columns: &ColumnNames) -> SegResult<Vec<Transaction>> {
    check_schema(records, columns)?;
    records
        .iter()
        .enumerate()
        .map(|(row, record)| Transaction::from_record(record, columns, row))
        .collect()
}

/// Keep rows with quantity > 0 and unit_price > 0, deriving total_price.
pub fn clean_transactions(transactions: &[Transaction]) -> Vec<CleanTransaction> {
    let cleaned: Vec<CleanTransaction> = transactions
        .iter()
        .cloned()
        .filter_map(Transaction::into_clean)
        .collect();
    log::info!(
        "cleaner: kept {} of {} rows",
        cleaned.len(),
        transactions.len()
    );
    cleaned
}

/// Filter on quantity and unit_price first, then coerce the kept rows.
pub fn clean_records(records: &[RawRecord], columns: &ColumnNames) -> SegResult<Vec<CleanTransaction>> {
    check_schema(records, columns)?;
    let mut cleaned = Vec::new();
    for (row, record) in records.iter().enumerate() {
        let (quantity, unit_price) = filter_keys(record, columns, row)?;
        if !passes_filter(quantity, unit_price) {
            log::debug!("cleaner: dropped row {row}");
            continue;
        }
        if let Some(txn) = Transaction::from_record(record, columns, row)?.into_clean() {
            cleaned.push(txn);
        }
    }
    log::info!("cleaner: kept {} of {} rows", cleaned.len(), records.len());
    Ok(cleaned)
}
