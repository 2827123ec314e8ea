// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use std::sync::Arc;

use common::{int_column, project, test_settings, FixtureSampler};
use entity_validator::core::data::{analyze_join, Cardinality, DataValidationSuite};
use entity_validator::core::service::{ValidationOptions, ValidationService};
use entity_validator::core::validation::{codes, Priority, Severity};

const ORDERS: &str = r#"
entities:
  customers: {columns: [customer_id], keys: [customer_id]}
  orders:
    columns: [customer_id]
    keys: []
    foreign_keys:
      - entity: customers
        local_keys: [customer_id]
        remote_keys: [customer_id]
"#;

/// 1000 orders over 50 customers; the last 50 orders point nowhere
fn mostly_matching() -> FixtureSampler {
    let orders = (0..950).map(|i| i % 50).chain(1000..1050);
    FixtureSampler::new()
        .with("orders", int_column("customer_id", orders))
        .with("customers", int_column("customer_id", 0..50))
}

#[test]
fn test_join_statistics() {
    let orders = int_column("customer_id", (0..950).map(|i| i % 50).chain(1000..1050));
    let customers = int_column("customer_id", 0..50);
    let key = vec!["customer_id".to_string()];

    let stats = analyze_join(&orders, &key, &customers, &key).unwrap();
    assert_eq!(stats.local_rows, 1000);
    assert_eq!(stats.matched_rows, 950);
    assert_eq!(stats.unmatched_rows, 50);
    assert_eq!(stats.match_percentage, 95.0);
    assert_eq!(stats.cardinality, Cardinality::ManyToOne);
}

#[tokio::test]
async fn test_unmatched_rows_above_threshold_are_medium_warnings() {
    let suite = DataValidationSuite::new(Arc::new(mostly_matching()), &test_settings());
    let result = suite.validate(&project(ORDERS)).await;

    let unmatched: Vec<_> = result.issues_with_code(codes::FK_UNMATCHED_ROWS).collect();
    assert_eq!(unmatched.len(), 1);
    let issue = unmatched[0];
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.priority, Priority::Medium);
    assert_eq!(issue.entity.as_deref(), Some("orders"));
    assert!(issue.message.contains("95.0% matched"));
    assert!(issue.message.contains("many_to_one"));
    assert!(result.is_valid);
}

#[tokio::test]
async fn test_unmatched_rows_below_threshold_are_high() {
    let mut settings = test_settings();
    settings.match_threshold = 99.0;
    let suite = DataValidationSuite::new(Arc::new(mostly_matching()), &settings);
    let result = suite.validate(&project(ORDERS)).await;

    let unmatched: Vec<_> = result.issues_with_code(codes::FK_UNMATCHED_ROWS).collect();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].priority, Priority::High);
}

#[tokio::test]
async fn test_failed_entity_does_not_block_others() {
    let config = project(
        r#"
entities:
  customers: {columns: [customer_id, email], keys: [customer_id]}
  invoices: {columns: [invoice_id], keys: [invoice_id]}
"#,
    );
    let sampler = FixtureSampler::new().with("customers", int_column("customer_id", 0..10));
    let suite = DataValidationSuite::new(Arc::new(sampler), &test_settings());
    let result = suite.validate(&config).await;

    let unavailable: Vec<_> = result.unavailable_checks().collect();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0].code, codes::SAMPLE_UNAVAILABLE);
    assert_eq!(unavailable[0].entity.as_deref(), Some("invoices"));

    let missing: Vec<_> = result.issues_with_code(codes::COLUMN_NOT_FOUND).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].entity.as_deref(), Some("customers"));
    assert!(!result.is_valid);
}

#[tokio::test(start_paused = true)]
async fn test_hung_sampler_times_out() {
    let config = project(
        r#"
entities:
  customers: {columns: [customer_id], keys: [customer_id]}
  hung: {columns: [id], keys: [id]}
"#,
    );
    let sampler = FixtureSampler::new().with("customers", int_column("customer_id", 0..10));
    let suite = DataValidationSuite::new(Arc::new(sampler), &test_settings());
    let result = suite.validate(&config).await;

    let unavailable: Vec<_> = result.unavailable_checks().collect();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0].entity.as_deref(), Some("hung"));
    assert!(unavailable[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_service_merges_structural_and_data_results() {
    let service = ValidationService::new(test_settings()).with_sampler(Arc::new(mostly_matching()));
    let config = project(ORDERS);

    let structural = service.validate_structure(&config);
    let merged = service
        .validate_with_options(&config, &ValidationOptions::with_data())
        .await;

    assert_eq!(
        merged.total_issues(),
        structural.total_issues() + 1,
        "data pass should add exactly the unmatched-rows warning"
    );
    assert!(merged.has_code(codes::FK_UNMATCHED_ROWS));
}
