use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crmdesk_gate::AccessGate;

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<AccessGate>,
}

/// Resolve the bearer token through the access gate and attach the
/// resulting `Caller` to the request. Rejects with a uniform 401 otherwise.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let caller = match state.gate.authenticate(extract_bearer(req.headers())) {
        Ok(caller) => caller,
        Err(_) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
        }
    };

    tracing::debug!(username = %caller.username(), path = %req.uri().path(), "request authenticated");
    req.extensions_mut().insert(caller);

    next.run(req).await
}

/// The token from `Authorization: Bearer <token>`, if present.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
