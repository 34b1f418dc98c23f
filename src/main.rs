//! Hosting Sales API server.
//!
//! Loads configuration from the environment, connects storage, registers
//! the configured payment gateways and serves the REST API.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use thiserror::Error;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hosting_sales::adapters::http::middleware::{USER_ID_HEADER, USER_ROLE_HEADER};
use hosting_sales::adapters::http::webhooks::{STRIPE_SIGNATURE_HEADER, WEBHOOK_SIGNATURE_HEADER};
use hosting_sales::adapters::http::{router, AppState};
use hosting_sales::adapters::{
    HmacWebhookVerifier, InMemorySalesStore, MockPaymentGateway, PostgresAuditLog,
    PostgresNumberGenerator, PostgresSalesStore, RedirectGateway, SequentialNumberGenerator,
    StripeConfig, StripeGateway, TracingAuditLog,
};
use hosting_sales::application::handlers::checkout::CheckoutOptions;
use hosting_sales::application::handlers::order::InvoiceOptions;
use hosting_sales::application::handlers::payment::{PaymentGateways, PaymentOptions};
use hosting_sales::config::{AppConfig, ConfigError, ServerConfig, ValidationError};
use hosting_sales::domain::customization::TaxRate;
use hosting_sales::domain::ordering::Gateway;
use hosting_sales::ports::WebhookVerifier;

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting hosting sales API"
    );

    let state = build_state(&config).await?;
    let app = router(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server));

    let addr = config.server.socket_addr()?;
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let (gateways, verifier) = build_gateways(config);

    let state = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to database...");
            let pool = database.pool_options().connect(&database.url).await?;
            tracing::info!("Database connection established");

            if database.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database migrations applied");
            }

            let store = PostgresSalesStore::new(pool.clone()).with_lock_timeout(database.lock_timeout_ms);
            AppState::with_store(
                Arc::new(store),
                Arc::new(PostgresNumberGenerator::new(pool.clone())),
                Arc::new(PostgresAuditLog::new(pool)),
                gateways,
                verifier,
            )
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            AppState::with_store(
                Arc::new(InMemorySalesStore::new()),
                Arc::new(SequentialNumberGenerator::new()),
                Arc::new(TracingAuditLog),
                gateways,
                verifier,
            )
        }
    };

    let tax_rate =
        TaxRate::new(config.checkout.tax_rate).map_err(|_| ValidationError::InvalidTaxRate)?;
    let checkout = CheckoutOptions {
        tax_rate,
        order_number_attempts: config.checkout.number_attempts,
        payment_url_base: config.checkout.payment_url_base.clone(),
    };
    let payment = PaymentOptions {
        currency: config.payment.currency.clone(),
        gateway_timeout: config.payment.gateway_timeout(),
    };
    let invoice = InvoiceOptions {
        due_in_days: config.checkout.invoice_due_days,
        number_attempts: config.checkout.number_attempts,
    };

    Ok(state.with_options(checkout, payment, invoice))
}

/// Registers every configured gateway with its webhook secret. Outside
/// production, gateways left unconfigured are served by a mock that
/// captures every charge.
fn build_gateways(config: &AppConfig) -> (PaymentGateways, Arc<dyn WebhookVerifier>) {
    let payment = &config.payment;
    let mut gateways = PaymentGateways::new();
    let mut verifier = HmacWebhookVerifier::new();

    if let Some(api_key) = &payment.stripe_api_key {
        let stripe = StripeConfig::new(api_key.clone(), payment.stripe_return_url.clone());
        gateways = gateways.register(Arc::new(StripeGateway::new(stripe)));
        if let Some(secret) = &payment.stripe_webhook_secret {
            verifier = verifier.with_secret(Gateway::Stripe, secret.clone());
        }
        tracing::info!(test_mode = payment.is_test_mode(), "Stripe gateway enabled");
    }

    for (name, checkout_url, secret) in payment.redirect_gateways() {
        let Ok(gateway) = name.parse::<Gateway>() else {
            continue;
        };
        gateways = gateways.register(Arc::new(RedirectGateway::new(gateway, checkout_url)));
        if let Some(secret) = secret {
            verifier = verifier.with_secret(gateway, secret.clone());
        }
        tracing::info!(gateway = name, "Redirect gateway enabled");
    }

    if !config.is_production() {
        for gateway in Gateway::ALL {
            if gateways.get(gateway).is_none() {
                tracing::warn!(gateway = gateway.as_str(), "Gateway not configured, using mock");
                gateways = gateways.register(Arc::new(MockPaymentGateway::new(gateway)));
            }
        }
    }

    (gateways, Arc::new(verifier))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins = server.cors_origins_list();
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
            HeaderName::from_static(STRIPE_SIGNATURE_HEADER),
            HeaderName::from_static(WEBHOOK_SIGNATURE_HEADER),
        ]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    tracing::info!("CORS configured with {} allowed origins", allowed.len());
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
