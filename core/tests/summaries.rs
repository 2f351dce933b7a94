mod common;

use common::{purchase, row};
use custseg_core::{
    clustering::{ClusterName, SegmentedCustomer},
    config::ColumnNames,
    rfm::{RfmRecord, SegmentLabel},
    summary::{
        cluster_revenue_ranking, cluster_summary, dataset_overview, segment_cluster_crosstab,
        segment_summary,
    },
    transaction::clean_records,
};
use serde_json::json;

fn rfm(id: &str, recency_days: i64, frequency: usize, monetary: f64, label: SegmentLabel) -> RfmRecord {
    RfmRecord {
        customer_id: id.to_string(),
        recency_days,
        frequency,
        monetary,
        r_score: 1,
        f_score: 1,
        m_score: 1,
        composite_score: "111".into(),
        segment_sum: 3,
        segment_label: label,
    }
}

fn customer(
    id: &str,
    monetary: f64,
    label: SegmentLabel,
    cluster_id: usize,
    cluster_name: ClusterName,
) -> SegmentedCustomer {
    SegmentedCustomer {
        rfm: rfm(id, 10, 2, monetary, label),
        cluster_id,
        cluster_name,
    }
}

#[test]
fn overview_counts_the_cleaned_set() {
    let rows = vec![
        purchase(1, "2024-01-03", 2, 1.5),
        purchase(2, "2024-01-01", 1, 4.0),
        purchase(1, "2024-02-10", 1, 2.0),
        row(json!(3), "2024-03-01", "Tea", json!(0), json!(2.0), json!(0.0)),
    ];
    let txns = clean_records(&rows, &ColumnNames::default()).unwrap();
    let overview = dataset_overview(&txns);

    assert_eq!(overview.total_transactions, 3);
    assert_eq!(overview.unique_customers, 2);
    assert_eq!(overview.first_date.unwrap().format("%Y-%m-%d").to_string(), "2024-01-01");
    assert_eq!(overview.last_date.unwrap().format("%Y-%m-%d").to_string(), "2024-02-10");
    assert!((overview.total_revenue - 9.0).abs() < 1e-12);
}

#[test]
fn overview_of_nothing_has_no_dates() {
    let overview = dataset_overview(&[]);
    assert_eq!(overview.total_transactions, 0);
    assert!(overview.first_date.is_none());
}

/// Groups come out in rule order, whatever the input order.
#[test]
fn segment_summary_averages_per_label_in_rule_order() {
    let records = vec![
        rfm("1", 100, 1, 10.0, SegmentLabel::Lost),
        rfm("2", 2, 9, 500.0, SegmentLabel::Champions),
        rfm("3", 120, 2, 30.0, SegmentLabel::Lost),
        rfm("4", 4, 7, 300.0, SegmentLabel::Champions),
    ];
    let summary = segment_summary(&records);

    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].segment, SegmentLabel::Champions);
    assert_eq!(summary[0].stats.count, 2);
    assert!((summary[0].stats.avg_recency - 3.0).abs() < 1e-12);
    assert!((summary[0].stats.avg_frequency - 8.0).abs() < 1e-12);
    assert!((summary[0].stats.avg_monetary - 400.0).abs() < 1e-12);
    assert!((summary[0].stats.total_revenue - 800.0).abs() < 1e-12);

    assert_eq!(summary[1].segment, SegmentLabel::Lost);
    assert!((summary[1].stats.avg_recency - 110.0).abs() < 1e-12);
    assert!((summary[1].stats.total_revenue - 40.0).abs() < 1e-12);
}

#[test]
fn cluster_summary_and_revenue_ranking() {
    let customers = vec![
        customer("1", 50.0, SegmentLabel::Lost, 2, ClusterName::LowEngagement),
        customer("2", 900.0, SegmentLabel::Champions, 0, ClusterName::VipChampions),
        customer("3", 70.0, SegmentLabel::Lost, 2, ClusterName::LowEngagement),
        customer("4", 200.0, SegmentLabel::LoyalCustomers, 1, ClusterName::RegularCustomers),
    ];
    let summary = cluster_summary(&customers);

    let ids: Vec<usize> = summary.iter().map(|s| s.cluster_id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(summary[2].cluster_name, ClusterName::LowEngagement);
    assert_eq!(summary[2].stats.count, 2);
    assert!((summary[2].stats.avg_monetary - 60.0).abs() < 1e-12);

    let ranking = cluster_revenue_ranking(&summary);
    let order: Vec<usize> = ranking.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!((ranking[2].1 - 120.0).abs() < 1e-12);
}

/// Two clusters sharing a name stay separate rows.
#[test]
fn cluster_summary_keeps_tied_names_apart() {
    let customers = vec![
        customer("1", 10.0, SegmentLabel::Lost, 0, ClusterName::RegularCustomers),
        customer("2", 20.0, SegmentLabel::Lost, 3, ClusterName::RegularCustomers),
    ];
    let summary = cluster_summary(&customers);
    assert_eq!(summary.len(), 2);
    assert!(summary.iter().all(|s| s.cluster_name == ClusterName::RegularCustomers));
}

#[test]
fn crosstab_counts_segment_cluster_pairs() {
    let customers = vec![
        customer("1", 1.0, SegmentLabel::Lost, 2, ClusterName::LowEngagement),
        customer("2", 1.0, SegmentLabel::Champions, 0, ClusterName::VipChampions),
        customer("3", 1.0, SegmentLabel::Lost, 2, ClusterName::LowEngagement),
        customer("4", 1.0, SegmentLabel::Lost, 1, ClusterName::RegularCustomers),
    ];
    let cells = segment_cluster_crosstab(&customers);

    let flat: Vec<(SegmentLabel, usize, usize)> =
        cells.iter().map(|c| (c.segment, c.cluster_id, c.count)).collect();
    assert_eq!(
        flat,
        vec![
            (SegmentLabel::Champions, 0, 1),
            (SegmentLabel::Lost, 1, 1),
            (SegmentLabel::Lost, 2, 2),
        ]
    );
    let total: usize = cells.iter().map(|c| c.count).sum();
    assert_eq!(total, customers.len());
}
