use std::{io, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, get_service},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::{services::ServeDir, trace::TraceLayer};
use url::Url;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod patch;
pub mod policy;
pub mod rate_limit;
pub mod read_model;
pub mod schema;
pub mod store;
pub mod uploads;
pub mod week;

use auth::{ApiKey, TokenKeys};
use config::Config;
use notify::Revalidator;
use rate_limit::RateLimiter;
use store::Store;
use uploads::{ImageStore, LocalImageStore};

/// Limits read by individual handlers.
pub struct Settings {
    pub assets_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub contact_window_days: i64,
    pub trusted_proxy_hops: usize,
}

/// Everything a request handler can reach, installed as an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenKeys>,
    pub api_key: Arc<ApiKey>,
    pub images: Arc<dyn ImageStore>,
    pub revalidator: Revalidator,
    pub limiter: RateLimiter,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Must be called inside a tokio runtime when revalidation is configured.
    pub fn new(config: &Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        config.check_ranges().context("invalid configuration")?;
        let tokens = TokenKeys::from_base64_secret(
            &config.jwt_secret,
            Duration::from_secs(config.jwt_expire_minutes * 60),
        )?;
        let public_url = Url::parse(&config.public_url).context("PUBLIC_URL is not a valid URL")?;
        let images = LocalImageStore::new(&config.assets_dir, &public_url)?;

        let revalidator = match &config.revalidate_url {
            Some(target) => {
                let target = Url::parse(target).context("FRONTEND_REVALIDATE_URL is not a valid URL")?;
                let (revalidator, _worker) = Revalidator::spawn(
                    target,
                    config.revalidate_secret.clone(),
                    Duration::from_millis(config.revalidate_timeout_ms),
                );
                revalidator
            }
            None => {
                tracing::info!("FRONTEND_REVALIDATE_URL is unset, frontend revalidation disabled");
                Revalidator::disabled()
            }
        };

        Ok(AppState {
            store,
            tokens: Arc::new(tokens),
            api_key: Arc::new(ApiKey::new(&config.api_key)),
            images: Arc::new(images),
            revalidator,
            limiter: RateLimiter::new(
                config.weekly_rate_limit,
                config.contact_rate_limit,
                Duration::from_secs(config.rate_limit_window_secs),
            ),
            settings: Arc::new(Settings {
                assets_dir: PathBuf::from(&config.assets_dir),
                max_upload_bytes: config.max_upload_bytes,
                contact_window_days: config.contact_window_days,
                trusted_proxy_hops: config.trusted_proxy_hops,
            }),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let serve = get_service(ServeDir::new(&state.settings.assets_dir)).handle_error(handle_error);
    Router::new()
        .merge(api::app().route_layer(middleware::from_fn(auth::require_api_key)))
        .route("/health", get(health))
        .nest("/assets", serve)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_error(e: io::Error) -> error::AppError {
    anyhow::Error::new(e).context("failed to fetch asset").into()
}
