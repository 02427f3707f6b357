mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, SwaggerConfig};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::sessions::TriageSettings;
use crate::features::AppServices;
use crate::modules::decision::{GeminiDecider, TriageDecider};
use crate::modules::mailer::{HttpMailer, LogNotifier, Notifier};
use crate::modules::store::{PgTriageStore, TriageStore};
use crate::shared::clock::{Clock, SystemClock};
use axum::{http::StatusCode, middleware::from_fn, Router};
use socket2::{Domain, Protocol, Socket, TcpKeepalive, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded: tokio_worker_threads={}, queue_offset={}",
        worker_threads,
        config.triage.queue_offset
    );

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    let store: Arc<dyn TriageStore> = Arc::new(PgTriageStore::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let decider: Arc<dyn TriageDecider> = Arc::new(
        GeminiDecider::new(config.decision.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create decision client: {}", e))?,
    );
    tracing::info!("Decision client initialized (model: {})", config.decision.model);

    let notifier: Arc<dyn Notifier> = match config.mailer.service_url.clone() {
        Some(url) => {
            let mailer = HttpMailer::new(url.clone(), &config.mailer)
                .map_err(|e| anyhow::anyhow!("Failed to create mail client: {}", e))?;
            tracing::info!("Mail relay configured: {}", url);
            Arc::new(mailer)
        }
        None => {
            tracing::warn!("MAIL_SERVICE_URL not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let settings = TriageSettings::from_config(&config.triage, &config.decision, &config.mailer);
    let services = AppServices::new(store, decider, notifier, clock, settings);
    tracing::info!("Services initialized");

    let app = Router::new()
        .merge(swagger_router(&config.swagger))
        .merge(services.routes())
        .route("/health", axum::routing::get(health_check))
        .layer(RequestBodyLimitLayer::new(config.app.max_request_body_size))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let listener = bind_listener(&addr)?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Swagger UI with the served document titled from config, optionally behind basic auth
fn swagger_router(config: &SwaggerConfig) -> Router {
    let mut openapi = ApiDoc::openapi();
    SwaggerInfoModifier {
        title: config.title.clone(),
        version: config.version.clone(),
        description: config.description.clone(),
    }
    .modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    match config.credentials() {
        Some(credentials) => {
            tracing::info!("Swagger UI basic auth enabled");
            swagger.layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
        }
        None => {
            tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
            swagger
        }
    }
}

/// TCP listener with address reuse, no-delay and keepalive set through socket2
fn bind_listener(addr: &str) -> anyhow::Result<tokio::net::TcpListener> {
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", addr, e))?;

    let socket = Socket::new(
        Domain::for_address(socket_addr),
        Type::STREAM,
        Some(Protocol::TCP),
    )?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
    #[cfg(target_os = "linux")]
    let keepalive = keepalive
        .with_interval(Duration::from_secs(10))
        .with_retries(3);
    socket.set_tcp_keepalive(&keepalive)?;

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    Ok(tokio::net::TcpListener::from_std(socket.into())?)
}
