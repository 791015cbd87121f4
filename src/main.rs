use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

mod bucket;
mod config;
mod db;
mod error;
mod forecast;
mod models;
mod refresh;
mod report;
mod summary;

use config::DbConfig;
use models::DayOfWeek;

#[derive(Parser)]
#[command(name = "campus-forecast")]
#[command(about = "Weekday campus congestion forecasts from crowd-sourced status reports", long_about = None)]
struct Cli {
    #[command(flatten)]
    db: DbConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed reports
    Seed,
    /// Import status reports from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rebuild every university's weekday timelines
    Refresh {
        #[arg(long, default_value_t = refresh::DEFAULT_WINDOW_WEEKS)]
        window_weeks: i64,
    },
    /// Print one stored timeline as JSON
    Show {
        #[arg(long)]
        university: i32,
        #[arg(long)]
        day: DayOfWeek,
    },
    /// Generate a markdown report of a university's stored timelines
    Report {
        #[arg(long)]
        university: i32,
        #[arg(long, default_value = "forecast.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();

    let cli = Cli::parse();
    let pool = db::connect(&cli.db).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} seed reports.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} reports from {}.", csv.display());
        }
        Commands::Refresh { window_weeks } => {
            let store = db::PgStore::new(pool.clone());
            let result = refresh::run_refresh(&store, &store, window_weeks, Utc::now()).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("failed to encode refresh result")?
            );
            if result.is_error() {
                anyhow::bail!("prediction refresh failed");
            }
        }
        Commands::Show { university, day } => {
            match db::fetch_prediction(&pool, university, day).await? {
                Some(prediction) => println!(
                    "{}",
                    serde_json::to_string_pretty(&prediction.timeline)
                        .context("failed to encode timeline")?
                ),
                None => println!("No prediction for university {university} on {day}."),
            }
        }
        Commands::Report { university, out } => {
            let predictions = db::fetch_predictions(&pool, university).await?;
            let report = report::build_report(university, &predictions);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
