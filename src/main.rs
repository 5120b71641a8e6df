use std::{path::Path, sync::Arc};

use anyhow::Context;
use clap::Parser;
use dharma_progress::{
    ProgressStore, Served,
    cli::{Cli, Command},
    config::Config,
    progress_api::{self, services::accounts::AccountService},
    progress_client::ProgressClient,
    storage::{FileStore, LocalStore, StoredToken},
};
use migration::MigratorTrait;
use poem::{
    EndpointExt, Server,
    listener::TcpListener,
    middleware::{Cors, Tracing as PoemTracing},
};
use sea_orm::Database;
use serde::Serialize;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type ProgressResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> ProgressResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,poem=info,reqwest=warn,h2=warn,sea_orm=warn,sqlx=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .pretty()
        .finish()
        .with(ErrorLayer::default())
        .init();

    // Load environment variables from .env files
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Serve => {
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                "starting Dharmasikhara progress API"
            );
            serve(Arc::new(config)).await?;
        }
        Command::Login { token } => {
            let (_, credentials) = progress_store(&config)?;
            credentials.login(&token)?;
            println!("signed in");
        }
        Command::Logout => {
            let (_, credentials) = progress_store(&config)?;
            credentials.logout()?;
            println!("signed out");
        }
        Command::Save { scenario_id, patch } => {
            let (store, _) = progress_store(&config)?;
            let saved = store.save(&scenario_id, patch.into()).await;
            if let Some(error) = &saved.local_write_error {
                tracing::error!(%error, "progress was not kept in local storage");
            }
            if saved.served.is_degraded() {
                tracing::warn!(reason = ?saved.fallback_reason(), "saved locally only while signed in");
            }
            print_json(&saved)?;
        }
        Command::Get { scenario_id } => {
            let (store, _) = progress_store(&config)?;
            print_served(&store.get(&scenario_id).await)?;
        }
        Command::List => {
            let (store, _) = progress_store(&config)?;
            print_served(&store.get_all().await)?;
        }
        Command::Forget { scenario_id } => {
            let (store, _) = progress_store(&config)?;
            let removed = store.forget_local(&scenario_id);
            println!("{}", if removed { "removed" } else { "nothing stored" });
        }
        Command::ResetLocal => {
            let (store, _) = progress_store(&config)?;
            println!("removed {} local records", store.clear_local());
        }
    }
    Ok(())
}

/// The adapter over the on-disk local storage, plus the token it reads.
fn progress_store(config: &Config) -> ProgressResult<(ProgressStore, StoredToken)> {
    let local: Arc<dyn LocalStore> = Arc::new(FileStore::open(&config.local_store_path)?);
    let credentials = StoredToken::new(local.clone());
    let client = ProgressClient::new(&config.api_base_url)?;
    tracing::debug!(api_base = %config.api_base_url, store = %config.local_store_path.display(), "configured progress store");
    let store = ProgressStore::new(local, Arc::new(client), Arc::new(credentials.clone()));
    Ok((store, credentials))
}

fn print_served<T: Serialize>(served: &Served<T>) -> ProgressResult<()> {
    if served.is_degraded() {
        tracing::warn!(reason = ?served.fallback_reason(), "served from local storage while signed in");
    }
    print_json(served)
}

fn print_json<T: Serialize>(value: &T) -> ProgressResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(config: Arc<Config>) -> ProgressResult<()> {
    let db = Database::connect(&config.db_connection_string)
        .await
        .with_context(|| "Failed to connect to database")?;

    migration::Migrator::up(&db, None)
        .await
        .with_context(|| "Failed to run database migrations")?;

    if let Some(token) = &config.bootstrap_token {
        AccountService::new(&db)
            .register(token)
            .await
            .with_context(|| "Failed to register bootstrap token")?;
    }

    let bind_addr = config.bind_addr.as_str();
    let route = progress_api::app(Arc::new(db), &format!("http://{bind_addr}"))
        .with(Cors::new())
        .with(PoemTracing);

    tracing::info!(%bind_addr, "starting HTTP server");
    Server::new(TcpListener::bind(bind_addr)).run(route).await?;
    Ok(())
}
