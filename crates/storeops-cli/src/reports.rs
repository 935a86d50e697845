//! Read-only report commands against the live database.

use chrono::Utc;
use sqlx::PgPool;

use storeops_core::{predict_churn, score_customers, segment_summary, OrderFilter};

async fn load_histories(pool: &PgPool) -> anyhow::Result<Vec<storeops_core::CustomerHistory>> {
    let customers = storeops_db::list_all_customers(pool).await?;
    let histories = storeops_db::load_customer_histories(pool, &customers).await?;
    Ok(histories)
}

fn thresholds() -> storeops_core::AnalyticsThresholds {
    let path = std::path::Path::new("./config/segments.yaml");
    if path.exists() {
        match storeops_core::load_thresholds(path) {
            Ok(t) => return t,
            Err(e) => tracing::warn!(error = %e, "failed to load thresholds; using defaults"),
        }
    }
    storeops_core::AnalyticsThresholds::default()
}

pub async fn rfm(pool: &PgPool) -> anyhow::Result<()> {
    let thresholds = thresholds();
    let histories = load_histories(pool).await?;
    let scores = score_customers(
        &histories,
        Utc::now(),
        OrderFilter::CompletedOnly,
        &thresholds.rfm,
    );
    let summary = segment_summary(&scores);

    println!("{:<12} {:>8} {:>14}", "segment", "count", "revenue");
    for row in &summary {
        println!("{:<12} {:>8} {:>14}", row.segment, row.count, row.revenue);
    }
    println!("scored customers: {}", scores.len());
    Ok(())
}

pub async fn churn(pool: &PgPool, days_threshold: i64) -> anyhow::Result<()> {
    anyhow::ensure!(
        (7..=365).contains(&days_threshold),
        "days-threshold must be between 7 and 365, got {days_threshold}"
    );

    let thresholds = thresholds();
    let histories = load_histories(pool).await?;
    let predictions = predict_churn(
        &histories,
        Utc::now(),
        days_threshold,
        OrderFilter::CompletedOnly,
        &thresholds.churn,
    );

    println!(
        "{:<28} {:>8} {:>12} {:>8}",
        "customer", "recency", "probability", "risk"
    );
    for p in &predictions {
        println!(
            "{:<28} {:>8} {:>11.1}% {:>8}",
            p.name, p.recency_days, p.churn_probability, p.churn_risk
        );
        for factor in &p.risk_factors {
            println!("    - {factor}");
        }
    }
    println!("at-risk customers: {}", predictions.len());
    Ok(())
}

pub async fn export_coupons(pool: &PgPool) -> anyhow::Result<()> {
    let rows = storeops_db::list_all_coupons(pool).await?;

    println!("Code,Type,Value,Usage Count,Usage Limit,Is Active");
    for row in &rows {
        let cells = [
            row.code.clone(),
            row.kind.clone(),
            row.value.to_string(),
            row.usage_count.to_string(),
            row.usage_limit.map(|l| l.to_string()).unwrap_or_default(),
            row.is_active.to_string(),
        ];
        let quoted: Vec<String> = cells
            .iter()
            .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
            .collect();
        println!("{}", quoted.join(","));
    }
    Ok(())
}
