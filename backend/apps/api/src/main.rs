//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by the
//! board crate.

use axum::{
    Router, http,
    http::{Method, header},
};
use board::adapters::{
    EmailApiConfig, HttpEmailSender, HttpPaymentGateway, LogEmailSender, PaymentApiConfig,
};
use board::domain::gateway::EmailSender;
use board::domain::value_object::email::Email;
use board::{BoardConfig, BoardResult, PgBoardRepository, board_router};
use platform::crypto::from_base64;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Email delivery chosen at startup
enum Mailer {
    Http(HttpEmailSender),
    Log(LogEmailSender),
}

impl EmailSender for Mailer {
    async fn send(&self, to: &Email, subject: &str, html: &str) -> BoardResult<()> {
        match self {
            Mailer::Http(sender) => sender.send(to, subject, html).await,
            Mailer::Log(sender) => sender.send(to, subject, html).await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,board=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set in environment"))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let repo = PgBoardRepository::new(pool.clone());

    // Startup cleanup; errors here should not prevent server startup
    if let Err(e) = repo.purge_expired_codes(chrono::Utc::now()).await {
        tracing::warn!(error = %e, "Verification code cleanup failed, continuing anyway");
    }

    let config = load_board_config()?;

    let mailer = match env::var("EMAIL_API_URL") {
        Ok(api_url) => {
            let sender_email = env::var("EMAIL_SENDER")
                .map_err(|_| anyhow::anyhow!("EMAIL_SENDER must be set with EMAIL_API_URL"))?;
            let email_config = EmailApiConfig {
                api_url,
                api_key: env::var("EMAIL_API_KEY")
                    .map_err(|_| anyhow::anyhow!("EMAIL_API_KEY must be set with EMAIL_API_URL"))?,
                sender_email,
                sender_name: config.site_name.clone(),
            };
            Mailer::Http(HttpEmailSender::new(email_config, config.outbound_timeout)?)
        }
        Err(_) => {
            tracing::warn!("EMAIL_API_URL not set; verification codes will only be logged");
            Mailer::Log(LogEmailSender)
        }
    };

    let payment_config = PaymentApiConfig {
        api_url: env::var("PAYMENT_API_URL")
            .unwrap_or_else(|_| "https://backend.payhero.co.ke/api/v2/payments".to_string()),
        authorization: env::var("PAYMENT_API_AUTH")
            .map_err(|_| anyhow::anyhow!("PAYMENT_API_AUTH must be set in environment"))?,
        channel_id: env::var("PAYMENT_CHANNEL_ID")
            .map_err(|_| anyhow::anyhow!("PAYMENT_CHANNEL_ID must be set in environment"))?
            .parse()?,
        provider: env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "m-pesa".to_string()),
    };
    let gateway = HttpPaymentGateway::new(payment_config, config.outbound_timeout)?;

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]));

    // Build router
    let app = Router::new()
        .nest("/api", board_router(repo, mailer, gateway, config))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Board configuration from the environment, over `BoardConfig::default()`
fn load_board_config() -> anyhow::Result<BoardConfig> {
    let random = BoardConfig::with_random_secret();
    let mut config = BoardConfig::default();

    config.session_secret = match secret_from_env("SESSION_SECRET")? {
        Some(secret) => secret,
        None if cfg!(debug_assertions) => {
            tracing::warn!("SESSION_SECRET not set; using a random secret for this run");
            random.session_secret
        }
        None => anyhow::bail!("SESSION_SECRET must be set in production"),
    };
    config.callback_secret = match secret_from_env("PAYMENT_CALLBACK_SECRET")? {
        Some(secret) => secret,
        None if cfg!(debug_assertions) => {
            tracing::warn!("PAYMENT_CALLBACK_SECRET not set; using a random secret for this run");
            random.callback_secret
        }
        None => anyhow::bail!("PAYMENT_CALLBACK_SECRET must be set in production"),
    };

    if let Ok(free_connects) = env::var("FREE_CONNECTS") {
        config.free_connects = free_connects.parse()?;
    }
    if let Ok(callback_url) = env::var("PAYMENT_CALLBACK_URL") {
        config.payment_callback_url = callback_url;
    }
    if let Ok(pepper) = env::var("PASSWORD_PEPPER") {
        config.password_pepper = Some(pepper.into_bytes());
    }
    if let Ok(site_name) = env::var("SITE_NAME") {
        config.site_name = site_name;
    }

    Ok(config)
}

/// 32-byte key given as standard base64
fn secret_from_env(name: &str) -> anyhow::Result<Option<[u8; 32]>> {
    let Ok(encoded) = env::var(name) else {
        return Ok(None);
    };
    let bytes = from_base64(encoded.trim())?;
    let secret = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{name} must decode to 32 bytes"))?;
    Ok(Some(secret))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
