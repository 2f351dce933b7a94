//! Customer aggregator: per-customer summaries in two shapes.
//!
//! The snapshot date is computed once over the whole cleaned set
//! (max date + 1 day) and threaded explicitly into the RFM pass.
//! Both passes emit every customer exactly once, ordered by customer id
//! (numerically when both ids are integers). That order is the tie-break
//! order for frequency ranking downstream.

use crate::{
    error::{SegError, SegResult},
    transaction::CleanTransaction,
    types::{CustomerId, Days},
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmAggregate {
    pub customer_id:  CustomerId,
    pub recency_days: Days,
    /// Transaction rows, not distinct orders.
    pub frequency:    usize,
    pub monetary:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvAggregate {
    pub customer_id:   CustomerId,
    pub num_purchases: usize,
    pub total_revenue: f64,
    pub lifespan_days: Days,
}

/// Running per-customer state shared by both passes.
#[derive(Debug, Clone)]
struct CustomerAccumulator {
    customer_id: CustomerId,
    rows:        usize,
    total:       f64,
    first:       NaiveDateTime,
    last:        NaiveDateTime,
}

fn accumulate(transactions: &[CleanTransaction]) -> Vec<CustomerAccumulator> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut customers: Vec<CustomerAccumulator> = Vec::new();

    for txn in transactions {
        match index.get(txn.customer_id.as_str()) {
            Some(&i) => {
                let c = &mut customers[i];
                c.rows += 1;
                c.total += txn.total;
                c.first = c.first.min(txn.date);
                c.last = c.last.max(txn.date);
            }
            None => {
                index.insert(txn.customer_id.as_str(), customers.len());
                customers.push(CustomerAccumulator {
                    customer_id: txn.customer_id.clone(),
                    rows:        1,
                    total:       txn.total,
                    first:       txn.date,
                    last:        txn.date,
                });
            }
        }
    }
    customers.sort_by(|a, b| compare_customer_ids(&a.customer_id, &b.customer_id));
    customers
}

/// Integer ids compare numerically, anything else lexically.
pub fn compare_customer_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Max transaction date plus one day. Errors on an empty set.
pub fn snapshot_date(transactions: &[CleanTransaction]) -> SegResult<NaiveDateTime> {
    transactions
        .iter()
        .map(|t| t.date)
        .max()
        .map(|max| max + Duration::days(1))
        .ok_or(SegError::InsufficientData {
            stage:  "snapshot date",
            needed: 1,
            found:  0,
        })
}

pub fn rfm_aggregates(
    transactions: &[CleanTransaction],
    snapshot: NaiveDateTime,
) -> Vec<RfmAggregate> {
    let aggregates: Vec<RfmAggregate> = accumulate(transactions)
        .into_iter()
        .map(|c| RfmAggregate {
            recency_days: (snapshot - c.last).num_days(),
            frequency:    c.rows,
            monetary:     c.total,
            customer_id:  c.customer_id,
        })
        .collect();
    log::debug!(
        "aggregator: {} RFM rows against snapshot {snapshot}",
        aggregates.len()
    );
    aggregates
}

pub fn cltv_aggregates(transactions: &[CleanTransaction]) -> Vec<CltvAggregate> {
    accumulate(transactions)
        .into_iter()
        .map(|c| CltvAggregate {
            num_purchases: c.rows,
            total_revenue: c.total,
            lifespan_days: (c.last - c.first).num_days(),
            customer_id:   c.customer_id,
        })
        .collect()
}
