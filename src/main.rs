use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use interview_backend::{
    config::{get_config, init_config, LogFormat},
    database::{pool::create_pool, FileStorage, PgStorage, SessionStorage},
    middleware::cors::cors_layer,
    routes,
    services::session_store::SessionStore,
    AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let storage: Arc<dyn SessionStorage> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            let storage = PgStorage::new(pool);
            storage.migrate().await?;
            info!("Using Postgres session storage");
            Arc::new(storage)
        }
        None => {
            let storage = FileStorage::new(&config.storage_dir);
            info!(path = %storage.path().display(), "Using file session storage");
            Arc::new(storage)
        }
    };

    let store = SessionStore::load(storage).await?;
    let app_state = AppState::from_config(store, config)?;

    if let Err(e) = app_state.interview.restore().await {
        tracing::error!(error = ?e, "Failed to resume the persisted interview");
    }

    let app = routes::api_router(config.public_rps)
        .with_state(app_state)
        .layer(cors_layer(config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
