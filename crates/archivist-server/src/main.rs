mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use archivist_api::media::METADATA_HEADERS;
use archivist_api::{AppState, AppStateInner};
use archivist_db::Database;
use archivist_ipfs::IpfsClient;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "archivist=debug,archivist_api=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    // Storage daemon
    let mut ipfs = IpfsClient::new(&config.ipfs_bin).with_probe_timeout(config.ipfs_probe_timeout);
    if let Some(api) = &config.ipfs_api {
        ipfs = ipfs.with_api(api.clone());
    }
    if ipfs.is_online().await {
        info!("IPFS daemon reachable via {}", config.ipfs_bin.display());
    } else {
        warn!(
            "IPFS daemon not reachable via {}; uploads and playback will fail until it is",
            config.ipfs_bin.display()
        );
    }

    archivist_api::error::expose_details(config.development);

    let state: AppState = Arc::new(AppStateInner {
        db,
        ipfs,
        max_upload_bytes: config.max_upload_bytes,
        trust_proxy: config.trust_proxy,
    });

    let mut allowed_headers = vec![CONTENT_TYPE];
    allowed_headers.extend(METADATA_HEADERS.into_iter().map(HeaderName::from_static));

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(&config.frontend_url)?)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(allowed_headers);

    // Uploads are length-checked while streaming; this only bounds JSON bodies
    let app = archivist_api::router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.listen_addr()?;
    info!("Archivist listening on {}", addr);
    info!(
        "Max upload: {} MB, trust proxy: {}",
        config.max_upload_bytes / (1024 * 1024),
        config.trust_proxy
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
