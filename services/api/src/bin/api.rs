//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpMailAdapter, TwilioSmsAdapter},
    config::Config,
    error::ApiError,
    scheduler::AlertScheduler,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method};
use axum::Router;
use crop_health_core::{NotificationDispatcher, RegionalAlertJob};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Notification Adapters ---
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let mail_adapter = Arc::new(HttpMailAdapter::new(http_client.clone(), config.mail.clone()));
    let mut dispatcher = NotificationDispatcher::new(mail_adapter, config.alerts.max_concurrent_sends);
    match &config.sms {
        Some(sms_config) => {
            info!("SMS alert channel enabled.");
            dispatcher = dispatcher.with_sms(Arc::new(TwilioSmsAdapter::new(http_client.clone(), sms_config.clone())));
        }
        None => info!("SMS alert channel disabled."),
    }

    // --- 4. Start the Regional Alert Scheduler ---
    let alert_job = Arc::new(RegionalAlertJob::new(db_adapter.clone(), dispatcher, config.alerts.clone()));
    let shutdown = CancellationToken::new();
    let scheduler_handle = AlertScheduler::new(alert_job, config.alert_schedule.clone()).spawn(shutdown.clone());

    // --- 5. Build the Shared AppState & Web Router ---
    let app_state = Arc::new(AppState { log: db_adapter.clone() });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static("x-user-id")]);

    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::error!("Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received.");
            server_shutdown.cancel();
        })
        .await?;

    // --- 7. Tear Down ---
    shutdown.cancel();
    if scheduler_handle.await.is_err() {
        tracing::error!("Alert scheduler task panicked.");
    }
    db_adapter.close().await;
    info!("Server stopped.");

    Ok(())
}
