//! # Event Pocket Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use ep_api::{router, AppState, RouterConfig};
use ep_config::{LogFormat, LogSettings, Settings};
use ep_core::BoardService;
use ep_ui::OfflinePolicy;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(feature = "db-sqlite")]
use ep_db_sqlite::SqliteCommentRepo;

#[cfg(feature = "storage-local")]
use ep_storage_local::LocalMediaStore;

#[cfg(feature = "auth-fingerprint")]
use ep_auth_fingerprint::HmacFingerprinter;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-fingerprint")))]
compile_error!("event-pocket needs a database, a media store and an identity provider feature");

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    match log.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

/// SQLite creates the file but not its directory.
fn sqlite_parent_dir(url: &str) -> Option<PathBuf> {
    if url.contains(":memory:") {
        return None;
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?
        .split('?')
        .next()?;
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; shutdown only by termination");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    if settings.identity.uses_dev_salt() {
        warn!("identity.salt is the built-in development value; set EVENT_POCKET__IDENTITY__SALT");
    }

    // 1. Initialize Database Implementation
    if let Some(dir) = sqlite_parent_dir(&settings.database.url) {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let repo = Arc::new(
        SqliteCommentRepo::new(&settings.database.url)
            .await
            .context("opening the comment database")?,
    );

    // 2. Initialize Storage Implementation
    let media_root = PathBuf::from(&settings.media.root);
    tokio::fs::create_dir_all(&media_root)
        .await
        .with_context(|| format!("creating {}", media_root.display()))?;
    let store = Arc::new(LocalMediaStore::new(
        media_root.clone(),
        settings.media.public_base_url.clone(),
    ));

    // 3. Initialize Identity Implementation
    let identity = Arc::new(HmacFingerprinter::new(&settings.identity.salt)?);

    // 4. Assemble the service and the shared state
    let uploads = settings.upload.policy();
    let service = BoardService::new(repo, store)
        .with_rules(settings.board.content_rules(uploads.max_files))
        .with_upload_policy(uploads)
        .with_offset(settings.board.offset()?);

    let state = Arc::new(AppState {
        service,
        identity,
        offline: OfflinePolicy::new(settings.offline.cache_version.clone()),
        trust_forwarded_for: settings.identity.trust_forwarded_for,
    });

    let app = router(
        state,
        &RouterConfig {
            media_dir: Some(media_root),
            media_route: settings.media.public_base_url.trim_end_matches('/').to_string(),
            cors_allow_any: settings.server.cors_allow_any,
        },
    );

    let address = settings.bind_addr();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "event pocket listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
