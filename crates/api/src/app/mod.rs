//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: builds the access gate from configuration
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: uniform JSON error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use crmdesk_gate::AccessGate;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(gate: Arc<AccessGate>) -> Router {
    let auth_state = middleware::AuthState { gate: gate.clone() };

    // Protected routes: a `Caller` is attached by the auth middleware.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/", get(routes::system::index))
        .route("/health", get(routes::system::health))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(gate)))
}
