use std::net::SocketAddr;
use std::sync::Arc;

use gatekeep_api::auth::password::Passwords;
use gatekeep_api::config::{DatabaseConfig, ServerConfig};
use gatekeep_api::mail::SmtpMailer;
use gatekeep_api::router::build_app_router;
use gatekeep_api::state::{AppState, Backends};
use gatekeep_core::clock::SystemClock;
use gatekeep_core::crypto::SettingsCipher;
use gatekeep_core::ids::RandomIds;
use gatekeep_db::store::{AuthStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gatekeep_api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let db_config = DatabaseConfig::from_env();
    let pool = gatekeep_db::create_pool(&db_config.url, &db_config.pool)
        .await
        .expect("Failed to connect to database");
    tracing::info!(
        max_connections = db_config.pool.max_connections,
        "Database connection pool created"
    );

    gatekeep_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    gatekeep_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Backends ---
    let store: Arc<dyn AuthStore> = Arc::new(PgStore::new(pool.clone()));
    let cipher = Arc::new(SettingsCipher::new(&config.settings_key.0));
    let mailer = Arc::new(SmtpMailer::new(Arc::clone(&store), cipher));
    let passwords = Passwords::new(&config.password).expect("Invalid Argon2 parameters");

    // --- App state ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let state = AppState::new(
        config,
        passwords,
        Backends {
            store,
            mailer,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIds),
        },
    );

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed `ClientInfo` when no X-Forwarded-For is present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, closing database pool");
    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
