use auth_service::{
    build_router,
    config::{AuthConfig, EmailMode},
    db,
    services::{
        AuthService, ConsoleEmailService, EmailProvider, JwtService, OtpIssuer, SmtpEmailService,
    },
    stores::{
        MemoryOtpStore, MemoryPendingSignupStore, MemoryUserStore, OtpStore, PendingSignupStore,
        PgOtpStore, PgUserStore, UserStore,
    },
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication service"
    );

    // Choose the storage backend: Postgres when configured, memory otherwise.
    let (users, otps, db_pool): (Arc<dyn UserStore>, Arc<dyn OtpStore>, _) =
        match &config.database.url {
            Some(url) => {
                let pool = db::create_pool(&config.database, url).await?;
                db::run_migrations(&pool).await.map_err(|e| {
                    service_core::error::AppError::InternalError(anyhow::anyhow!(e))
                })?;
                tracing::info!("Database initialized successfully");
                (
                    Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>,
                    Arc::new(PgOtpStore::new(pool.clone())) as Arc<dyn OtpStore>,
                    Some(pool),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
                (
                    Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>,
                    Arc::new(MemoryOtpStore::new()) as Arc<dyn OtpStore>,
                    None,
                )
            }
        };

    // Pending signups are transient by nature and always live in memory.
    let pending: Arc<dyn PendingSignupStore> = Arc::new(MemoryPendingSignupStore::new());

    let email: Arc<dyn EmailProvider> = match config.email_mode {
        EmailMode::Smtp => Arc::new(SmtpEmailService::new(&config.smtp)?),
        EmailMode::Console => {
            tracing::info!("Email service running in console mode");
            Arc::new(ConsoleEmailService)
        }
    };

    let jwt = JwtService::new(&config.jwt);
    tracing::info!("JWT service initialized");

    let issuer = OtpIssuer::new(otps.clone(), email, config.otp.ttl_minutes);
    let auth_service = AuthService::new(
        users,
        otps.clone(),
        pending,
        issuer,
        jwt.clone(),
        config.otp.min_password_length,
    );

    // Background sweep of expired OTP codes.
    let sweep_interval = config.otp.sweep_interval_seconds;
    let sweep_store = otps.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            match sweep_store.sweep_expired().await {
                Ok(removed) if removed > 0 => {
                    tracing::debug!(removed, "Swept expired OTP codes");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "OTP sweep failed");
                }
            }
        }
    });

    let state = AppState {
        config: config.clone(),
        jwt,
        auth_service,
        db_pool,
    };

    let app = build_router(state)?;

    let addr = config.common.bind_addr();
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
