//! Named threshold configuration for every business rule in the analytics
//! engine. All cutoffs live here instead of being scattered through the
//! scoring code, and can be overridden from a YAML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Cutoffs for customer-list segmentation (VIP / LOYAL / NEW / AT_RISK /
/// INACTIVE / REGULAR).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentThresholds {
    /// Minimum lifetime value, in whole currency units, for VIP.
    pub vip_min_spent: i64,
    /// Minimum order count for LOYAL.
    pub loyal_min_orders: u64,
    /// Days since signup within which a purchasing customer is NEW.
    pub new_days: i64,
    /// Days without an order before a customer is AT_RISK.
    pub at_risk_days: i64,
    /// Days without an order before a customer is INACTIVE.
    pub inactive_days: i64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            vip_min_spent: 5_000,
            loyal_min_orders: 5,
            new_days: 30,
            at_risk_days: 60,
            inactive_days: 180,
        }
    }
}

/// Fixed cutoffs for RFM segment classification. Checked in priority order;
/// these are business rules, not statistically fitted bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RfmThresholds {
    pub champion_max_recency_days: i64,
    pub champion_min_frequency: u64,
    pub champion_min_monetary: i64,
    pub loyal_max_recency_days: i64,
    pub loyal_min_frequency: u64,
    pub new_max_recency_days: i64,
    pub at_risk_min_recency_days: i64,
    pub lost_min_recency_days: i64,
}

impl Default for RfmThresholds {
    fn default() -> Self {
        Self {
            champion_max_recency_days: 30,
            champion_min_frequency: 5,
            champion_min_monetary: 1_000,
            loyal_max_recency_days: 90,
            loyal_min_frequency: 3,
            new_max_recency_days: 30,
            at_risk_min_recency_days: 90,
            lost_min_recency_days: 180,
        }
    }
}

/// Parameters for lifetime-value projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClvConfig {
    /// Months of future purchasing projected forward.
    pub horizon_months: f64,
    /// Recency decay constant, in days; the projected component shrinks by
    /// `e^(-recency / decay)`.
    pub recency_decay_days: f64,
    /// Days of inactivity at which the numeric churn-risk score saturates.
    pub churn_window_days: f64,
    /// Minimum current value, in whole currency units, for the `high` segment.
    pub high_value_min: i64,
    /// Minimum current value for the `medium` segment.
    pub medium_value_min: i64,
}

impl Default for ClvConfig {
    fn default() -> Self {
        Self {
            horizon_months: 12.0,
            recency_decay_days: 180.0,
            churn_window_days: 180.0,
            high_value_min: 5_000,
            medium_value_min: 1_000,
        }
    }
}

/// Heuristic weights for churn prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnHeuristics {
    /// Probability assigned the moment a customer crosses the lookback
    /// threshold.
    pub base_probability: f64,
    /// Days of additional inactivity over which probability ramps from the
    /// base toward 100.
    pub recency_ramp_days: f64,
    /// Added when the latest order is smaller than the customer's prior
    /// average.
    pub spend_decline_penalty: f64,
    /// Added when the current gap exceeds the customer's typical order
    /// interval.
    pub cadence_decline_penalty: f64,
    /// Gap-to-mean-interval ratio beyond which cadence is considered
    /// declined.
    pub cadence_decline_ratio: f64,
    /// Probability at or above which risk is `medium`.
    pub medium_cutoff: f64,
    /// Probability at or above which risk is `high`.
    pub high_cutoff: f64,
    /// Multiples of the mean inter-order interval after the last order at
    /// which the customer is predicted to have churned.
    pub churn_date_interval_multiplier: i64,
}

impl Default for ChurnHeuristics {
    fn default() -> Self {
        Self {
            base_probability: 30.0,
            recency_ramp_days: 365.0,
            spend_decline_penalty: 15.0,
            cadence_decline_penalty: 10.0,
            cadence_decline_ratio: 1.5,
            medium_cutoff: 40.0,
            high_cutoff: 70.0,
            churn_date_interval_multiplier: 2,
        }
    }
}

/// The full set of tunable analytics rules, loadable from one YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsThresholds {
    pub segments: SegmentThresholds,
    pub rfm: RfmThresholds,
    pub clv: ClvConfig,
    pub churn: ChurnHeuristics,
}

/// Load and validate analytics thresholds from a YAML file. Missing keys fall
/// back to the compiled defaults.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_thresholds(path: &Path) -> Result<AnalyticsThresholds, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ThresholdsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let thresholds: AnalyticsThresholds = serde_yaml::from_str(&content)?;
    validate_thresholds(&thresholds)?;
    Ok(thresholds)
}

fn validate_thresholds(t: &AnalyticsThresholds) -> Result<(), ConfigError> {
    if t.segments.at_risk_days >= t.segments.inactive_days {
        return Err(ConfigError::Validation(format!(
            "segments.at_risk_days ({}) must be below segments.inactive_days ({})",
            t.segments.at_risk_days, t.segments.inactive_days
        )));
    }
    if t.rfm.at_risk_min_recency_days >= t.rfm.lost_min_recency_days {
        return Err(ConfigError::Validation(format!(
            "rfm.at_risk_min_recency_days ({}) must be below rfm.lost_min_recency_days ({})",
            t.rfm.at_risk_min_recency_days, t.rfm.lost_min_recency_days
        )));
    }
    if t.clv.recency_decay_days <= 0.0 || t.clv.horizon_months <= 0.0 {
        return Err(ConfigError::Validation(
            "clv.recency_decay_days and clv.horizon_months must be positive".to_string(),
        ));
    }
    if t.clv.medium_value_min >= t.clv.high_value_min {
        return Err(ConfigError::Validation(format!(
            "clv.medium_value_min ({}) must be below clv.high_value_min ({})",
            t.clv.medium_value_min, t.clv.high_value_min
        )));
    }
    if t.churn.medium_cutoff >= t.churn.high_cutoff {
        return Err(ConfigError::Validation(format!(
            "churn.medium_cutoff ({}) must be below churn.high_cutoff ({})",
            t.churn.medium_cutoff, t.churn.high_cutoff
        )));
    }
    if t.churn.cadence_decline_ratio <= 1.0 {
        return Err(ConfigError::Validation(
            "churn.cadence_decline_ratio must exceed 1.0".to_string(),
        ));
    }
    Ok(())
}
