use thiserror::Error;

pub mod app_config;
pub mod churn;
pub mod clv;
mod config;
pub mod coupon_analytics;
pub mod coupons;
pub mod domain;
pub mod rfm;
pub mod segmentation;
pub mod thresholds;

pub use app_config::{AppConfig, Environment};
pub use churn::{predict_churn, ChurnPrediction, ChurnRisk};
pub use clv::{project_clv, ClvProjection, ValueSegment};
pub use config::{load_app_config, load_app_config_from_env};
pub use coupon_analytics::{
    coupon_performance, expiring_within, overall_stats, redemption_rate, roi, CouponPerformance,
    CouponUsage, OverallCouponStats,
};
pub use coupons::{apply_coupon, generate_code, Coupon, CouponKind, DiscountOutcome};
pub use domain::{CustomerHistory, CustomerMetrics, OrderFilter, OrderStatus, OrderSummary};
pub use rfm::{score_customers, segment_summary, RfmScore, RfmSegment, SegmentSummary};
pub use segmentation::{classify_customer, CustomerSegment};
pub use thresholds::{
    load_thresholds, AnalyticsThresholds, ChurnHeuristics, ClvConfig, RfmThresholds,
    SegmentThresholds,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read thresholds file at {path}")]
    ThresholdsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse thresholds file")]
    ThresholdsFileParse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
