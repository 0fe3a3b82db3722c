//! Route definitions for the Shopfront API
//!
//! This module organizes all routes and applies middleware. Failures that no
//! handler converted (unknown routes, wrong methods, timeouts, oversized
//! bodies, panics) leave the router as the `{status, statusCode, message}`
//! envelope.

use crate::error::envelope_response;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::any::Any;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, warn};

mod auth;
mod extract;
mod health;


pub use auth::{auth_routes, cookie_value, REFRESH_COOKIE};
pub use extract::ValidatedJson;

/// Create the main application router with all middleware
pub fn create_router(state: AppState) -> Router {
    let server = &state.config().server;
    let timeout = Duration::from_secs(server.request_timeout_secs);
    let body_limit = server.body_limit_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(render_metrics))
        .merge(auth::auth_routes())
        .fallback(unknown_endpoint)
        // Apply middleware layers
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(normalize_error_responses))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn unknown_endpoint(method: Method, uri: Uri) -> Response {
    warn!(%method, path = uri.path(), "Unknown endpoint");
    envelope_response(StatusCode::NOT_FOUND, "Unknown endpoint")
}

/// Prometheus text exposition, when a recorder was handed to the state
async fn render_metrics(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    match state.metrics() {
        Some(handle) => handle.render().into_response(),
        None => unknown_endpoint(method, uri).await,
    }
}

/// Rewrite error responses that are not JSON into the envelope
///
/// Handler errors already carry a JSON body and pass through untouched.
async fn normalize_error_responses(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    if status.is_server_error() {
        error!(%method, path = %path, status = status.as_u16(), "Request failed");
    } else {
        warn!(%method, path = %path, status = status.as_u16(), "Request rejected");
    }

    let message = status.canonical_reason().unwrap_or("Request failed");
    envelope_response(status, message)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = detail, "Handler panicked");
    envelope_response(StatusCode::INTERNAL_SERVER_ERROR, detail)
}
