//! Registration desk server.
//!
//! Wires the Postgres, Redis, payment and messaging adapters into the
//! registration handlers and serves the HTTP API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use registration_desk::adapters::http::{registration_router, RegistrationAppState};
use registration_desk::adapters::messaging::{HttpMessagingConfig, HttpMessagingGateway};
use registration_desk::adapters::pass::TextPassRenderer;
use registration_desk::adapters::postgres::{
    PostgresDeliveryLockStore, PostgresEventRepository, PostgresMemberDirectory,
    PostgresRegistrationRepository,
};
use registration_desk::adapters::razorpay::{RazorpayConfig, RazorpayGateway};
use registration_desk::adapters::redis::{RedisJobQueue, RedisQueueKeys};
use registration_desk::application::delivery::{
    DeliveryExecutor, DeliveryLockManager, DispatcherConfig, NotificationDispatcher, QueueHandle,
    QueueWorker, QueueWorkerConfig,
};
use registration_desk::application::handlers::registration::{
    CancelRegistrationHandler, CheckInHandler, ConfirmPaymentHandler, RegisterHandler,
    ResendPassHandler, ScanPassHandler, UnlockPassHandler,
};
use registration_desk::application::PaymentVerifier;
use registration_desk::config::{AppConfig, RedisConfig, ServerConfig};
use registration_desk::domain::pass::PassTokenService;
use registration_desk::ports::JobQueue;

/// Extra time background deliveries get beyond one send timeout to
/// finish once the server has stopped.
const DISPATCH_DRAIN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        "Starting registration desk"
    );

    // Storage
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let registrations = Arc::new(PostgresRegistrationRepository::new(pool.clone()));
    let lock_store = Arc::new(PostgresDeliveryLockStore::new(pool.clone()));
    let events = Arc::new(PostgresEventRepository::new(pool.clone()));
    let members = Arc::new(PostgresMemberDirectory::new(pool.clone()));

    // External gateways
    let payment_gateway = Arc::new(RazorpayGateway::new(
        RazorpayConfig::new(&config.payment.key_id, reveal(&config.payment.key_secret))
            .with_base_url(&config.payment.api_base_url)
            .with_timeout(config.payment.timeout()),
    )?);
    let payments = Arc::new(PaymentVerifier::new(
        payment_gateway,
        config.payment.callback_secret(),
        &config.payment.currency,
    ));
    let messaging = Arc::new(HttpMessagingGateway::new(
        HttpMessagingConfig::new(&config.messaging.api_url, reveal(&config.messaging.api_token))
            .with_timeout(config.messaging.send_timeout()),
    )?);

    let tokens = PassTokenService::new(config.pass.token_secret.expose_secret().as_bytes())?;
    let renderer = Arc::new(TextPassRenderer::new().with_title(&config.pass.title));

    // Delivery pipeline
    let queue = connect_queue(&config.redis).await;
    let locks = Arc::new(
        DeliveryLockManager::new(lock_store).with_stale_after(config.delivery.lock_stale_after()),
    );
    let executor = Arc::new(DeliveryExecutor::new(
        locks.clone(),
        messaging,
        config.messaging.send_timeout(),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        registrations.clone(),
        events.clone(),
        members.clone(),
        tokens.clone(),
        renderer,
        queue.clone(),
        locks.clone(),
        executor.clone(),
        DispatcherConfig {
            sender_name: config.messaging.sender_name.clone(),
            default_country_code: config.messaging.default_country_code.clone(),
            max_concurrent: config.delivery.max_concurrent,
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = match &queue {
        QueueHandle::Available(job_queue) => {
            let worker = QueueWorker::with_config(
                Arc::clone(job_queue),
                registrations.clone(),
                executor.clone(),
                QueueWorkerConfig::default()
                    .with_poll_wait(config.delivery.worker_poll_wait())
                    .with_error_backoff(config.delivery.worker_error_backoff()),
            );
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move { worker.run(rx).await }))
        }
        QueueHandle::Unavailable { reason } => {
            tracing::warn!(reason = %reason, "Delivery queue unavailable, passes will be sent inline");
            None
        }
    };

    // HTTP
    let state = RegistrationAppState {
        register: Arc::new(RegisterHandler::new(
            registrations.clone(),
            events.clone(),
            members.clone(),
            events.clone(),
            payments.clone(),
            dispatcher.clone(),
        )),
        confirm_payment: Arc::new(ConfirmPaymentHandler::new(
            registrations.clone(),
            events.clone(),
            payments.clone(),
            dispatcher.clone(),
        )),
        check_in: Arc::new(CheckInHandler::new(registrations.clone())),
        scan_pass: Arc::new(ScanPassHandler::new(tokens, registrations.clone())),
        cancel: Arc::new(CancelRegistrationHandler::new(
            registrations.clone(),
            events.clone(),
            payments,
        )),
        resend_pass: Arc::new(ResendPassHandler::new(
            registrations,
            locks.clone(),
            dispatcher.clone(),
        )),
        unlock_pass: Arc::new(UnlockPassHandler::new(locks)),
        queue_available: queue.is_available(),
    };

    let app = registration_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Unable to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    let mut server_shutdown = shutdown_rx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.changed().await;
        })
        .await?;

    if let Some(handle) = worker_handle {
        tracing::info!("Waiting for delivery queue worker to finish its current job");
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Queue worker task ended abnormally");
        }
    }

    let drain = config.messaging.send_timeout() + DISPATCH_DRAIN_GRACE;
    if tokio::time::timeout(drain, dispatcher.shutdown()).await.is_err() {
        tracing::warn!("Background pass deliveries still running at shutdown");
    }

    pool.close().await;
    tracing::info!("Registration desk stopped");
    Ok(())
}

/// Copies a secret for an adapter that takes ownership of it.
fn reveal(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().clone())
}

/// JSON logs in production, human-readable output elsewhere.
/// `RUST_LOG` overrides the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Connects the Redis job queue, or reports why deliveries go inline.
async fn connect_queue(redis: &RedisConfig) -> QueueHandle {
    let Some(url) = redis.url.as_deref().filter(|_| redis.is_enabled()) else {
        return QueueHandle::unavailable("redis not configured");
    };

    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => return QueueHandle::unavailable(format!("invalid redis url: {}", e)),
    };

    let keys = RedisQueueKeys::with_prefix(&redis.queue_prefix);
    match tokio::time::timeout(redis.timeout(), RedisJobQueue::connect(&client, keys)).await {
        Ok(Ok(queue)) => {
            tracing::info!(prefix = %redis.queue_prefix, "Delivery queue connected");
            let queue: Arc<dyn JobQueue> = Arc::new(queue);
            QueueHandle::Available(queue)
        }
        Ok(Err(e)) => QueueHandle::unavailable(e.to_string()),
        Err(_) => QueueHandle::unavailable("redis connection timed out"),
    }
}
