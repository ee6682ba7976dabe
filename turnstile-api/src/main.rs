//! Turnstile Server Entry Point
//!
//! Bootstraps configuration, starts the reservation cache, and serves a
//! demonstration create route behind the idempotency gate.
//!
//! The identity middleware used here is the development header adapter; a
//! real deployment swaps in its own authentication layer, which must insert
//! [`turnstile_api::CallerIdentity`] before the gate runs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::post,
    BoxError, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use turnstile_api::{
    header_identity, idempotency_gate, GateState, Settings, StartupError,
};
use turnstile_cache::InMemoryIdempotencyCache;

/// Budget for the downstream operation before the request is cancelled.
const DOWNSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    init_tracing();

    let settings = Settings::from_env();
    settings.validate()?;

    let cache = Arc::new(InMemoryIdempotencyCache::new(settings.memory_cache_config()));
    let state = GateState::new(cache.clone(), settings);

    let app = demo_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Turnstile server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    cache.shutdown().await;
    Ok(())
}

/// Demonstration router: one create route behind the full middleware stack.
///
/// Order (outer to inner): trace, identity, idempotency gate, downstream
/// timeout, handler. The timeout sits inside the gate so a cancelled
/// operation surfaces as a failure status and no reservation is committed.
fn demo_router(state: GateState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_downstream_error))
                .layer(TimeoutLayer::new(DOWNSTREAM_TIMEOUT)),
        )
        .layer(from_fn_with_state(state, idempotency_gate))
        .layer(from_fn(header_identity))
        .layer(TraceLayer::new_for_http())
}

async fn handle_downstream_error(err: BoxError) -> StatusCode {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Downstream operation timed out");
        StatusCode::GATEWAY_TIMEOUT
    } else {
        tracing::error!(error = %err, "Downstream operation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// DEMO CREATE ROUTE
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    item: String,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct OrderCreated {
    order_id: Uuid,
    item: String,
    quantity: u32,
}

async fn create_order(Json(request): Json<CreateOrderRequest>) -> impl IntoResponse {
    let order = OrderCreated {
        order_id: Uuid::now_v7(),
        item: request.item,
        quantity: request.quantity,
    };
    tracing::info!(order_id = %order.order_id, "Order created");
    (StatusCode::CREATED, Json(order))
}

// ============================================================================
// BOOTSTRAP HELPERS
// ============================================================================

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("TURNSTILE_LOG_JSON")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn resolve_bind_addr() -> Result<SocketAddr, StartupError> {
    let host = std::env::var("TURNSTILE_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("TURNSTILE_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| StartupError::Bind(format!("invalid port value: {port_str}")))?;

    let addr = format!("{host}:{port}");
    addr.parse::<SocketAddr>()
        .map_err(|e| StartupError::Bind(format!("invalid bind address {addr}: {e}")))
}
