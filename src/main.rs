//! borrowbox server entry point.
//!
//! Starts the Axum HTTP server with the REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use mockable::DefaultClock;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use borrowbox::api;
use borrowbox::app_state::AppState;
use borrowbox::config::ServiceConfig;
use borrowbox::notify::http::HttpNotifierConfig;
use borrowbox::notify::{HttpNotifier, LogNotifier, NotificationSender};
use borrowbox::persistence::{AccountStore, LendingStore, MemoryStore, PostgresStore};
use borrowbox::service::{SharedClock, VerificationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting borrowbox");

    // Build persistence layer
    let (accounts, lending, postgres): (
        Arc<dyn AccountStore>,
        Arc<dyn LendingStore>,
        Option<Arc<PostgresStore>>,
    ) = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connecting to PostgreSQL")?;
        let store = Arc::new(PostgresStore::new(pool));
        store.migrate().await.context("running migrations")?;
        tracing::info!("persistence: postgres");
        (
            Arc::clone(&store) as Arc<dyn AccountStore>,
            Arc::clone(&store) as Arc<dyn LendingStore>,
            Some(store),
        )
    } else {
        let store = Arc::new(MemoryStore::new());
        tracing::warn!("persistence disabled; data lives in memory only");
        (
            Arc::clone(&store) as Arc<dyn AccountStore>,
            store as Arc<dyn LendingStore>,
            None,
        )
    };

    // Build notification sender
    let notifier: Arc<dyn NotificationSender> = match &config.mailer {
        Some(mailer) => {
            let http = HttpNotifier::new(HttpNotifierConfig {
                url: mailer.url.clone(),
                api_key: mailer.api_key.clone(),
                from: mailer.from.clone(),
                ttl_minutes: config.code_ttl_minutes,
                timeout: config.mailer_timeout,
            })
            .context("building mailer client")?;
            tracing::info!(url = %mailer.url, "notifications: http mailer");
            Arc::new(http)
        }
        None => {
            tracing::warn!("MAILER_URL not set; verification codes are only logged");
            Arc::new(LogNotifier)
        }
    };

    // Build service layer
    let clock: SharedClock = Arc::new(DefaultClock);
    let verification = VerificationService::new(
        Arc::clone(&accounts),
        notifier,
        Arc::clone(&clock),
        config.allowed_domains.clone(),
        config.code_ttl,
    );
    let app_state = AppState::new(accounts, lending, clock, verification);

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        app.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = postgres {
        store.close().await;
    }
    tracing::info!("shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
