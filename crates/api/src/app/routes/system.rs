use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crmdesk_gate::{AccessGate, Caller};

use crate::app::{dto, errors};

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "name": "crmdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "login": "POST /login",
            "logout": "POST /logout",
            "whoami": "GET /whoami",
            "dashboard": "GET /dashboard",
            "customers": "GET|POST /customers",
            "leads": "GET|POST /leads",
            "sales": "GET|POST /sales",
            "candidates": "GET|POST /candidates, GET|PATCH|DELETE /candidates/:id",
        },
    }))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn whoami(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
) -> axum::response::Response {
    match gate.identity(&caller) {
        Some(identity) => Json(dto::WhoAmIResponse::from(identity)).into_response(),
        // Identities are never removed; a live caller always has one.
        None => errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required"),
    }
}
