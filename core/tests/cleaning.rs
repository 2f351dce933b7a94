mod common;

use common::{canteen_rows, record, row};
use custseg_core::{
    config::ColumnNames,
    error::SegError,
    transaction::{clean_records, parse_date, parse_records},
};
use serde_json::json;

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every kept row has quantity > 0 and unit_price > 0.
#[test]
fn cleaned_rows_have_positive_quantity_and_price() {
    let rows = canteen_rows();
    let cleaned = clean_records(&rows, &ColumnNames::default()).unwrap();

    assert_eq!(cleaned.len(), rows.len() - 2, "the return and the zero-price line must be dropped");
    for t in &cleaned {
        assert!(t.quantity > 0, "quantity={} must be > 0", t.quantity);
        assert!(t.unit_price > 0.0, "unit_price={} must be > 0", t.unit_price);
    }
}

/// total_price is quantity * unit_price, while total keeps the source value.
#[test]
fn total_price_is_derived_and_total_is_preserved() {
    let rows = vec![row(json!("A"), "2024-01-05", "Tea", json!(3), json!(1.5), json!(4.0))];
    let cleaned = clean_records(&rows, &ColumnNames::default()).unwrap();

    assert_eq!(cleaned.len(), 1);
    assert!((cleaned[0].total_price - 4.5).abs() < 1e-12);
    assert!((cleaned[0].total - 4.0).abs() < 1e-12, "total must not be recomputed");
}

#[test]
fn cleaning_preserves_input_order() {
    let rows = vec![
        row(json!("B"), "2024-01-02", "Tea", json!(1), json!(1.0), json!(1.0)),
        row(json!("A"), "2024-01-01", "Tea", json!(0), json!(1.0), json!(0.0)),
        row(json!("C"), "2024-01-03", "Tea", json!(2), json!(1.0), json!(2.0)),
        row(json!("A"), "2024-01-04", "Tea", json!(1), json!(1.0), json!(1.0)),
    ];
    let cleaned = clean_records(&rows, &ColumnNames::default()).unwrap();
    let ids: Vec<&str> = cleaned.iter().map(|t| t.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "C", "A"]);
}

/// A missing required column aborts with a Schema error naming it.
#[test]
fn missing_column_is_a_schema_error() {
    let rows = vec![record(json!({
        "Customer ID": 1,
        "Date": "2024-01-01",
        "Item": "Tea",
        "Quantity": 1,
        "Total": 1.0,
    }))];

    match clean_records(&rows, &ColumnNames::default()) {
        Err(SegError::Schema { column, row, .. }) => {
            assert_eq!(column, "Price");
            assert_eq!(row, 0);
        }
        other => panic!("expected Schema error, got {other:?}"),
    }
}

/// Columns are matched exactly; a differently cased header is missing.
#[test]
fn column_names_are_matched_exactly() {
    let rows = vec![record(json!({
        "customer id": 1,
        "Date": "2024-01-01",
        "Item": "Tea",
        "Quantity": 1,
        "Price": 1.0,
        "Total": 1.0,
    }))];
    assert!(matches!(
        clean_records(&rows, &ColumnNames::default()),
        Err(SegError::Schema { .. })
    ));
}

#[test]
fn malformed_values_are_schema_errors() {
    let bad_date = vec![row(json!(1), "yesterday", "Tea", json!(1), json!(1.0), json!(1.0))];
    let bad_total = vec![row(json!(1), "2024-01-01", "Tea", json!(1), json!(1.0), json!("lots"))];
    let fractional_quantity = vec![row(json!(1), "2024-01-01", "Tea", json!(1.5), json!(1.0), json!(1.5))];

    for rows in [bad_date, bad_total, fractional_quantity] {
        assert!(
            matches!(parse_records(&rows, &ColumnNames::default()), Err(SegError::Schema { .. })),
            "expected Schema error for {rows:?}"
        );
    }
}

/// A return line is dropped on its quantity before its other values are read.
#[test]
fn dropped_rows_are_not_coerced_beyond_the_filter_columns() {
    let rows = vec![
        row(json!(1), "2024-01-01", "Tea", json!(1), json!(1.0), json!(1.0)),
        row(json!("?"), "yesterday", "Tea", json!(-1), json!(1.0), json!("n/a")),
        row(json!(2), "2024-01-02", "Tea", json!(2), json!(0.0), json!(["x"])),
    ];
    let cleaned = clean_records(&rows, &ColumnNames::default()).unwrap();
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].customer_id, "1");

    assert!(matches!(
        parse_records(&rows, &ColumnNames::default()),
        Err(SegError::Schema { row: 1, .. })
    ));
}

/// A kept row is still coerced in full.
#[test]
fn kept_rows_with_malformed_values_are_schema_errors() {
    let rows = vec![
        row(json!(1), "2024-01-01", "Tea", json!(-1), json!(1.0), json!("n/a")),
        row(json!(1), "yesterday", "Tea", json!(1), json!(1.0), json!(1.0)),
    ];
    match clean_records(&rows, &ColumnNames::default()) {
        Err(SegError::Schema { column, row, .. }) => {
            assert_eq!(column, "Date");
            assert_eq!(row, 1);
        }
        other => panic!("expected Schema error, got {other:?}"),
    }
}

/// A null quantity or price compares false against zero and is dropped.
#[test]
fn null_quantity_or_price_rows_are_dropped() {
    let rows = vec![
        row(json!(1), "2024-01-01", "Tea", json!(null), json!(1.0), json!(1.0)),
        row(json!(2), "2024-01-01", "Tea", json!(1), json!(null), json!(1.0)),
        row(json!(3), "2024-01-01", "Tea", json!(1), json!(1.0), json!(1.0)),
    ];
    let cleaned = clean_records(&rows, &ColumnNames::default()).unwrap();
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].customer_id, "3");
}

#[test]
fn numeric_identifiers_and_strings_are_coerced() {
    let rows = vec![
        row(json!(17850), "2024-01-01", "Tea", json!("2"), json!("1.25"), json!(2.5)),
        row(json!(17851.0), "2024-01-02", "Tea", json!(2.0), json!(1.25), json!(2.5)),
    ];
    let cleaned = clean_records(&rows, &ColumnNames::default()).unwrap();
    assert_eq!(cleaned[0].customer_id, "17850");
    assert_eq!(cleaned[0].quantity, 2);
    assert!((cleaned[0].unit_price - 1.25).abs() < 1e-12);
    assert_eq!(cleaned[1].customer_id, "17851");
    assert_eq!(cleaned[1].quantity, 2);
}

#[test]
fn custom_column_names_are_honoured() {
    let columns = ColumnNames {
        customer_id: "CustomerID".into(),
        date:        "InvoiceDate".into(),
        item:        "StockCode".into(),
        quantity:    "Quantity".into(),
        unit_price:  "UnitPrice".into(),
        total:       "Amount".into(),
    };
    let rows = vec![record(json!({
        "CustomerID": "X1",
        "InvoiceDate": "2010-12-01 08:26:00",
        "StockCode": 85123,
        "Quantity": 6,
        "UnitPrice": 2.55,
        "Amount": 15.3,
    }))];
    let cleaned = clean_records(&rows, &columns).unwrap();
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].item, "85123");
}

#[test]
fn supported_date_formats_parse() {
    for text in [
        "2024-02-29",
        "2024-02-29 13:45:00",
        "2024-02-29T13:45:00",
        "2024-02-29 13:45",
        "02/29/2024",
        "02/29/2024 13:45",
    ] {
        let parsed = parse_date(text).unwrap_or_else(|| panic!("{text} should parse"));
        assert_eq!(parsed.date().format("%Y-%m-%d").to_string(), "2024-02-29");
    }
    assert!(parse_date("29.02.2024").is_none());
}
