use std::net::SocketAddr;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use foodmap::config::Config;
use foodmap::database;
use foodmap::services::image_service::ImageUrls;
use foodmap::web::{self, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    info!("Connecting to database: {}", config.database_url);
    let pool = database::connect(&config.database_url, config.db_max_connections).await?;
    database::migrate(&pool).await?;

    let state = AppState {
        pool,
        images: ImageUrls::new(config.storage_url.clone()),
    };
    let app = web::app(&config, state);

    let listener = bind_with_fallback(&config.host, config.port).await?;
    let bound_addr = listener.local_addr()?;
    info!("🚀 Server running on http://{}", bound_addr);
    info!("📍 Map markers at http://{}/api/v1/restaurants/map", bound_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn bind_with_fallback(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    match TcpListener::bind(addr).await {
        Ok(l) => Ok(l),
        Err(e) => {
            let fallback = SocketAddr::new(addr.ip(), port.saturating_add(1));
            warn!(
                "⚠️  Could not bind {}: {}. Trying fallback {}",
                addr, e, fallback
            );
            TcpListener::bind(fallback).await
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
