//! # CollabHub API Server
//!
//! Serves the project collaboration API: accounts, projects, members,
//! invitations and boards.
//!
//! With `DATABASE_URL` set the server runs on PostgreSQL and applies pending
//! migrations at startup; without it, state lives in memory and is lost on
//! exit.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p collabhub-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use collabhub_api::{
    app::{build_router, AppState},
    config::Config,
};
use collabhub_shared::db::{memory::MemoryStore, pool::DatabaseConfig, postgres::PgStore, store::Store};
use collabhub_shared::notify::{webhook::WebhookNotifier, InvitationNotifier, LogNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "collabhub_api=debug,collabhub_shared=debug,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database {
        Some(database) => {
            let store = PgStore::connect(DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to open PostgreSQL store")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn InvitationNotifier>> {
    let notifications = &config.notifications;
    match &notifications.webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Delivering invitations by webhook");
            let notifier = WebhookNotifier::new(
                url.clone(),
                notifications.webhook_secret.clone(),
                notifications.public_base_url.clone(),
            )
            .context("Failed to build invitation webhook client")?;
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "CollabHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let notifier = build_notifier(&config)?;
    let bind_address = config.bind_address();
    if config.external_identity.secret.is_none() {
        tracing::warn!("EXTERNAL_IDENTITY_SECRET not set; external sign-in is disabled");
    }

    let state = AppState::new(store, notifier, config);
    let system = state
        .services
        .accounts
        .ensure_system_account()
        .await
        .context("Failed to provision the system account")?;
    tracing::info!(email = %system.email, "System account ready");

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
