use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marquee_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, PgCatalog},
    middleware::{make_span_with_request_id, request_id_middleware},
    routes::{create_router, AppState},
    services::gateway::TypesenseGateway,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let (cache, writer) = Cache::new(create_redis_client(redis_url)?);
            tracing::info!("Redis cache enabled");
            (Some(cache), Some(writer))
        }
        None => {
            tracing::info!("REDIS_URL not set, caching disabled");
            (None, None)
        }
    };

    let gateway = TypesenseGateway::new(
        config.typesense_url(),
        config.typesense_api_key.clone(),
        config.typesense_timeout_seconds,
    )?;

    let state = AppState::new(
        Arc::new(PgCatalog::new(pool)),
        Arc::new(gateway),
        cache,
        &config,
    );

    let app = create_router(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), typesense = %config.typesense_url(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
