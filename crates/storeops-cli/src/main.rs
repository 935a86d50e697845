mod reports;
mod seed;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "storeops")]
#[command(about = "Storeops back-office command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Populate the database with demo customers, orders, and coupons.
    Seed,
    /// Print the RFM segment summary.
    RfmReport,
    /// Print churn predictions for customers past the lookback window.
    ChurnReport {
        /// Days without an order before a customer counts as at risk.
        #[arg(long, default_value_t = 90)]
        days_threshold: i64,
    },
    /// Dump the coupon table as CSV on stdout.
    ExportCoupons,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pool = storeops_db::connect_pool_from_env().await?;
    storeops_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Seed => seed::run(&pool).await?,
        Commands::RfmReport => reports::rfm(&pool).await?,
        Commands::ChurnReport { days_threshold } => {
            reports::churn(&pool, days_threshold).await?;
        }
        Commands::ExportCoupons => reports::export_coupons(&pool).await?,
    }

    Ok(())
}
