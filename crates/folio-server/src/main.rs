//! # folio-server
//!
//! HTTP backend for the portfolio site.
//!
//! This binary provides:
//! - **Public content API** (axum) serving the profile, home hero, resume
//!   link and every collection, plus live updates as server-sent events
//! - **Visitor submissions** for ratings (with an optional photo) and
//!   contact messages
//! - **Admin dashboard API** behind bearer-token identities, gated on the
//!   admin role
//! - **Blob storage** for uploaded images and the resume PDF
//! - **Per-IP rate limiting**, tighter on the submission endpoints

mod api;
mod config;
mod error;
mod rate_limit;

use std::sync::Arc;

use folio_content::{CountryDirectory, ImageHostClient, LocalBlobStore};
use folio_store::{ContentStore, Database};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::{Quota, RateLimiter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,folio_server=debug")),
        )
        .init();

    info!("Starting Folio server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.admin_uids.is_empty() {
        tracing::warn!("No ADMIN_UIDS configured, only stored admin roles can open the dashboard");
    }

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Content tree (runs migrations on open)
    let database = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    let store = Arc::new(ContentStore::new(database));

    // Blob store (creates directory if missing)
    let blobs = Arc::new(
        LocalBlobStore::new(
            config.blob_storage_path.clone(),
            config.max_blob_size,
            &config.public_base_url,
        )
        .await?,
    );

    let image_host = config.image_host_url.as_deref().map(|url| {
        info!(url = %url, "Hero images go to the image host");
        Arc::new(ImageHostClient::new(url, &config.image_host_preset))
    });

    let identity = Arc::new(config.identity_provider());
    info!(identities = identity.len(), "Bearer identities loaded");

    let countries = Arc::new(CountryDirectory::new(&config.countries_api_url));

    let rate_limiter = RateLimiter::new(Quota::BROWSING);
    let submissions_limiter = RateLimiter::new(Quota::SUBMISSIONS);

    let http_addr = config.http_addr;
    let app_state = AppState {
        store,
        blobs,
        image_host,
        identity,
        countries,
        rate_limiter: rate_limiter.clone(),
        submissions_limiter: submissions_limiter.clone(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.purge_stale(std::time::Duration::from_secs(600)).await;
            submissions_limiter
                .purge_stale(std::time::Duration::from_secs(600))
                .await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
