//! plotledger - colony and plot management backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plotledger::{
    config::Args,
    db::MongoClient,
    server,
    store::{MemoryStore, MongoStore, Store},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("plotledger={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  plotledger - colony & plot backend");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    // Connect to MongoDB; dev mode falls back to the in-memory store
    let (store, mongo): (Arc<dyn Store>, Option<MongoClient>) =
        match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                let store = MongoStore::new(&client).await?;
                (Arc::new(store), Some(client))
            }
            Err(e) => {
                if args.dev_mode {
                    warn!(
                        "MongoDB connection failed (dev mode, using in-memory store): {}",
                        e
                    );
                    (Arc::new(MemoryStore::new()), None)
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    let state = Arc::new(server::AppState::new(args, store, mongo)?);

    // One-time migration of legacy single-owner settings fields
    match state.settings.migrate_legacy_owner().await {
        Ok(true) => info!("Legacy owner settings migrated into the owners registry"),
        Ok(false) => {}
        Err(e) => {
            error!("Settings migration failed: {}", e);
            std::process::exit(1);
        }
    }

    // Dev-mode convenience: a fresh in-memory instance gets an admin account
    if state.args.dev_mode && state.mongo.is_none() {
        state
            .users
            .bootstrap_admin("admin@plotledger.local", "admin-dev-password")
            .await?;
        info!("Dev admin: admin@plotledger.local / admin-dev-password");
    }

    server::run(state).await?;
    Ok(())
}
