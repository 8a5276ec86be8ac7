use std::sync::Arc;

use clap::Parser;
use pitch_core::{ChatCompletionClient, CompletionConfig, HistoryStore, PitchConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use pitch_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "pitch.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match PitchConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Store pool connects lazily; nothing touches the database yet
    let store = match pitch_core::db::open_history_store(&config.database) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to configure history store: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match store.health().await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match store.ensure_collection().await {
            Ok(()) => println!("✅ Collection {} ready", store.collection()),
            Err(e) => {
                println!("❌ Collection check failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Pitch store health check passed");
        return Ok(());
    }

    if let Err(e) = store.ensure_collection().await {
        tracing::warn!(error = %e, "Could not prepare collection at startup; retrying on first write");
    }

    let completion_config = CompletionConfig::from_llm_config(&config.llm);
    if completion_config.api_key.is_empty() {
        tracing::warn!(env = %config.llm.api_key_env, "No completion API key set");
    }
    let completion = ChatCompletionClient::new(completion_config)?;

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
        config,
        completion: Arc::new(completion),
        store: Arc::new(store),
    };

    http::start_http_server(state, tx.subscribe()).await
}
