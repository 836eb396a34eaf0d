use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use club_directory::{
    config::Config,
    lifecycle,
    store::{connect_to_db, MemoryStore, PgStore, Store},
    AppState,
};
use envconfig::Envconfig;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "club_directory=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::init_from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match &config.db_url {
        Some(db_url) => Arc::new(PgStore::new(connect_to_db(db_url)?)),
        None => {
            tracing::warn!("DATABASE_URL is unset, data is kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        lifecycle::bootstrap_admin(store.as_ref(), email, password)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bootstrap the administrator: {e}"))?;
    }

    let state = AppState::new(&config, store)?;

    let limiter = state.limiter.clone();
    let prune_every = Duration::from_secs(config.rate_limit_window_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(prune_every);
        loop {
            ticker.tick().await;
            limiter.prune().await;
        }
    });

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .context("CORS_ORIGIN is not a valid header value")?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(origin);
    let app = club_directory::app(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
