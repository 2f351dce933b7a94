#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use custseg_core::transaction::RawRecord;
use serde_json::{json, Value};

pub fn record(value: Value) -> RawRecord {
    value.as_object().cloned().expect("fixture rows are JSON objects")
}

pub fn row(customer: Value, date: &str, item: &str, quantity: Value, price: Value, total: Value) -> RawRecord {
    record(json!({
        "Customer ID": customer,
        "Date": date,
        "Item": item,
        "Quantity": quantity,
        "Price": price,
        "Total": total,
    }))
}

/// One clean purchase line with `total = quantity * price`.
pub fn purchase(customer: i64, date: &str, quantity: i64, price: f64) -> RawRecord {
    row(
        json!(customer),
        date,
        "Sandwich",
        json!(quantity),
        json!(price),
        json!(quantity as f64 * price),
    )
}

pub fn day(offset_back: i64) -> String {
    let anchor = NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid anchor date");
    (anchor - Duration::days(offset_back)).format("%Y-%m-%d").to_string()
}

pub const CANTEEN_CUSTOMERS: i64 = 16;

/// Sixteen customers with distinct recency, varied frequency and spend,
/// plus a return and a zero-price line that cleaning must drop.
pub fn canteen_rows() -> Vec<RawRecord> {
    let mut rows = Vec::new();
    for i in 0..CANTEEN_CUSTOMERS {
        let customer = 1001 + i;
        let purchases = 1 + (i * 7) % 6;
        let last_offset = (i * 11) % 90;
        for j in 0..purchases {
            let quantity = 1 + j % 3;
            let price = 2.5 * (1 + (i * 13) % 17) as f64;
            rows.push(purchase(customer, &day(last_offset + j * 5), quantity, price));
        }
    }
    rows.push(row(json!(1001), &day(3), "Coffee", json!(-1), json!(2.0), json!(-2.0)));
    rows.push(row(json!(1002), &day(4), "Water", json!(1), json!(0.0), json!(0.0)));
    rows
}
