//! Accord-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use accord_api::{TopicHub, middleware::AppState, router as api_router, streaming_handler};
use accord_common::Config;
use accord_core::{
    EventPublisherService, IdentityService, MessageService, Profile, StaticIdentityProvider,
};
use accord_db::repositories::MessageRepository;
use accord_pubsub::{PubSubBridge, RedisPubSub};
use axum::{Router, middleware, routing::get};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
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
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Build the development identity provider from `ACCORD_DEV_TOKENS`.
///
/// Format: comma-separated `token=member_id:display_name` entries. A real
/// deployment replaces this with its own `IdentityProvider`.
fn identity_from_env() -> IdentityService {
    let mut provider = StaticIdentityProvider::new();

    if let Ok(tokens) = std::env::var("ACCORD_DEV_TOKENS") {
        for entry in tokens.split(',').filter(|e| !e.is_empty()) {
            if let Some((token, rest)) = entry.split_once('=')
                && let Some((id, display_name)) = rest.split_once(':')
            {
                provider = provider.with_token(
                    token.trim(),
                    Profile {
                        id: id.trim().to_string(),
                        display_name: display_name.trim().to_string(),
                    },
                );
            }
        }
    }

    Arc::new(provider)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accord=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting accord-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = accord_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    accord_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories and services
    let db = Arc::new(db);
    let message_repo = MessageRepository::new(Arc::clone(&db));
    let mut message_service = MessageService::new(message_repo);

    // Initialize the local event hub
    let hub = TopicHub::new();

    // Cross-instance fan-out is optional; without Redis the local hub is
    // the whole event channel.
    let publisher: EventPublisherService = if let Some(redis) = &config.redis {
        info!("Connecting to Redis...");
        let pubsub = Arc::new(RedisPubSub::new(&redis.url, &redis.prefix).await?);
        pubsub.start().await?;

        // Events received from other instances flow into the local hub
        let bridge = PubSubBridge::new(Arc::clone(&pubsub));
        let bridge_hub = hub.clone();
        bridge.start(move |event| bridge_hub.send(event));

        info!("Connected to Redis Pub/Sub");
        pubsub
    } else {
        Arc::new(hub.clone())
    };
    message_service.set_event_publisher(publisher);

    let identity = identity_from_env();

    // Create app state
    let state = AppState {
        message_service,
        identity,
        hub,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            accord_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
