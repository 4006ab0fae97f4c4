use std::sync::Arc;

use atelier_core::{create_backend, AtelierConfig, LlmBackendConfig};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use atelier_server::http::{self, HttpState};
use atelier_server::Assistant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "atelier.toml")]
    config: String,

    /// Check the database and exit
    #[arg(long)]
    health: bool,

    /// Apply the schema before serving
    #[arg(long)]
    init_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match AtelierConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    let pool = match atelier_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to open database {}: {}", config.database.url, e);
            std::process::exit(1);
        }
    };

    if args.init_db {
        atelier_core::db::init_schema(&pool).await?;
    }

    if args.health {
        match atelier_core::db::health_check(&pool).await {
            Ok(v) => println!("SQLite connected: {}", v),
            Err(e) => {
                println!("SQLite connection failed: {}", e);
                std::process::exit(1);
            }
        }
        match atelier_core::db::table_counts(&pool).await {
            Ok((users, products, orders)) => {
                println!("Rows: {} users, {} products, {} orders", users, products, orders)
            }
            Err(e) => {
                println!("Schema check failed (run with --init-db?): {}", e);
                std::process::exit(1);
            }
        }
        println!("Atelier DB health check passed");
        return Ok(());
    }

    let backend = create_backend(LlmBackendConfig::from_config(&config.llm)?)?;
    tracing::info!(backend = backend.name(), model = %config.llm.model, "Language model backend ready");
    let assistant = Arc::new(Assistant::new(
        pool.clone(),
        Arc::from(backend),
        config.assistant.clone(),
    ));

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = HttpState {
        pool,
        config,
        assistant,
    };
    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
