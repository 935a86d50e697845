//! Offline unit tests for storeops-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::Utc;
use rust_decimal::Decimal;
use storeops_core::{AppConfig, CouponKind, Environment};
use storeops_db::{CouponUsageRow, CustomerRow, OrderRow, PoolConfig};
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        thresholds_path: PathBuf::from("./config/segments.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CustomerRow`] and [`OrderRow`]
/// carry the fields the analytics assembly expects. No database required.
#[test]
fn customer_and_order_rows_have_expected_fields() {
    let customer = CustomerRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        phone: None,
        city: Some("Austin".to_string()),
        country: Some("US".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let order = OrderRow {
        id: 10_i64,
        public_id: Uuid::new_v4(),
        customer_id: customer.id,
        total: Decimal::new(19_999, 2), // 199.99
        status: "COMPLETED".to_string(),
        created_at: Utc::now(),
    };

    assert_eq!(order.customer_id, customer.id);
    assert_eq!(order.status, "COMPLETED");
    assert_eq!(order.total, Decimal::new(19_999, 2));
}

#[test]
fn coupon_usage_row_converts_into_engine_input() {
    let row = CouponUsageRow {
        public_id: Uuid::new_v4(),
        code: "SUMMER10".to_string(),
        kind: "PERCENTAGE".to_string(),
        value: Decimal::from(10),
        is_active: true,
        usage_count: 50,
        usage_limit: Some(100),
        valid_from: Utc::now(),
        valid_until: Utc::now(),
        total_revenue: Decimal::from(5_000),
        total_discount: Decimal::from(500),
        order_count: 50,
        campaign_count: 2,
    };

    let usage = row.into_usage().expect("known kind");
    assert_eq!(usage.kind, CouponKind::Percentage);
    assert_eq!(usage.usage_count, 50);
    assert_eq!(usage.total_revenue, Decimal::from(5_000));
}

#[test]
fn coupon_usage_row_with_unknown_kind_is_rejected() {
    let row = CouponUsageRow {
        public_id: Uuid::new_v4(),
        code: "BROKEN".to_string(),
        kind: "BOGO".to_string(),
        value: Decimal::ZERO,
        is_active: true,
        usage_count: 0,
        usage_limit: None,
        valid_from: Utc::now(),
        valid_until: Utc::now(),
        total_revenue: Decimal::ZERO,
        total_discount: Decimal::ZERO,
        order_count: 0,
        campaign_count: 0,
    };

    let result = row.into_usage();
    assert!(
        matches!(result, Err(storeops_db::DbError::UnexpectedValue { ref column, .. }) if column == "coupons.kind"),
        "expected UnexpectedValue for coupons.kind, got: {result:?}"
    );
}
