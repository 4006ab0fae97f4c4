use std::path::PathBuf;

use atelier_core::AtelierConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use atelier_seed::{catalogue, seed};

#[derive(Debug, Parser)]
#[command(name = "atelier-seed", version, about = "Create and fill the Atelier SQLite store")]
struct Cli {
    #[arg(short, long, default_value = "atelier.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply the schema
    Init,

    /// Clean a raw catalogue CSV and upsert its products
    Products {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Trim or top up users to COUNT
    Users {
        #[arg(long, default_value_t = 50)]
        count: i64,
    },

    /// Trim or top up random orders to COUNT
    Orders {
        #[arg(long, default_value_t = 50)]
        count: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AtelierConfig::load(&cli.config)?;

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    let pool = atelier_core::db::create_pool(&config.database).await?;
    atelier_core::db::init_schema(&pool).await?;

    match cli.command {
        Commands::Init => println!("Database initialised at {}", config.database.url),
        Commands::Products { csv } => {
            let products = catalogue::load_catalogue(&csv)?;
            let report = seed::seed_products(&pool, &products).await?;
            println!("Products seeded: {}, skipped: {}, total now: {}", report.inserted, report.skipped, report.total);
        }
        Commands::Users { count } => {
            let report = seed::seed_users(&pool, count).await?;
            println!("Users seeded: {}, deleted: {}, total now: {}", report.inserted, report.deleted, report.total);
        }
        Commands::Orders { count } => {
            let report = seed::seed_orders(&pool, count, seed::today()).await?;
            println!("Orders seeded: {}, deleted: {}, total now: {}", report.inserted, report.deleted, report.total);
        }
    }

    pool.close().await;
    Ok(())
}
