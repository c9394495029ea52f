//! Wiring & DI. Entry point: bootstrap adapters, inject into services, serve.
//! No business logic here; per-event work is delegated to IngestService.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tg_relay::adapters::http::{router, ApiState};
use tg_relay::adapters::persistence::SqliteStore;
use tg_relay::adapters::telegram::BotApi;
use tg_relay::ports::{EventSource, OutboundSink, StorePort};
use tg_relay::usecases::{IngestService, SubscriptionListener, TriggerResolver};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    let cfg = match tg_relay::shared::config::AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config load failed; falling back to defaults");
            tg_relay::shared::config::AppConfig::default()
        }
    };

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    let store: Arc<dyn StorePort> = Arc::new(
        SqliteStore::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );

    // --- Telegram (optional capability): polling + send require a token ---
    let bot = if cfg.is_telegram_configured() {
        let token = cfg.telegram_token().unwrap_or_default();
        Some(Arc::new(
            BotApi::new(token, cfg.poll_timeout_secs_or_default())
                .map_err(|e| anyhow::anyhow!("{}", e))?,
        ))
    } else {
        warn!("TG_RELAY_TELEGRAM_TOKEN not provided; polling disabled, send API unavailable");
        None
    };
    let sink: Option<Arc<dyn OutboundSink>> = bot
        .as_ref()
        .map(|b| Arc::clone(b) as Arc<dyn OutboundSink>);

    // --- Ingestion pipeline: bounded channel for backpressure ---
    if let Some(bot) = &bot {
        let queue_size = cfg.event_queue_size_or_default();
        info!(queue_size, "event queue buffer (backpressure)");
        let (event_tx, event_rx) = mpsc::channel(queue_size);

        let resolver = TriggerResolver::new(Arc::clone(&store));
        let ingest = Arc::new(IngestService::new(
            Arc::clone(&store),
            resolver,
            sink.clone(),
        ));
        tokio::spawn(async move {
            ingest.run(event_rx).await;
        });

        let listener = SubscriptionListener::new(
            Arc::clone(bot) as Arc<dyn EventSource>,
            event_tx,
        );
        tokio::spawn(async move {
            // A subscription-level failure ends the listener only; the
            // control API keeps serving already-persisted data.
            if let Err(e) = listener.run().await {
                error!(error = %e, "inbound subscription terminated");
            }
        });
    }

    // --- Control API ---
    let cors = match &cfg.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = router(ApiState { store, sink }).layer(cors).layer(
        tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            },
        ),
    );

    let addr = format!(
        "{}:{}",
        cfg.http_host_or_default(),
        cfg.http_port_or_default()
    );
    info!("control API listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
