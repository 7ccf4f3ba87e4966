use std::env;

use dotenvy::dotenv;
use tracing_subscriber::{fmt, EnvFilter};

use foodmap::config::Config;
use foodmap::database;
use foodmap::services::seed_service::{self, SeedFile};

#[tokio::main]
async fn main() {
    dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var("SEED_FILE").ok())
        .unwrap_or_else(|| "seeds/directory.json".to_string());

    match run(&path).await {
        Ok(report) => {
            println!(
                "seed: categories={}, restaurants={}, images={}, skipped={}",
                report.categories, report.restaurants, report.images, report.skipped
            );
        }
        Err(e) => {
            eprintln!("seed failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(path: &str) -> Result<seed_service::SeedReport, Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_json::from_str(&raw)?;

    let pool = database::connect(&config.database_url, config.db_max_connections).await?;
    database::migrate(&pool).await?;

    Ok(seed_service::seed_directory(&pool, &seed).await?)
}
