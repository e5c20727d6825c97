use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crmdesk_gate::AccessGate;

use crate::app::{dto, errors};
use crate::middleware::extract_bearer;

pub async fn login(
    Extension(gate): Extension<Arc<AccessGate>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text());
        }
    };

    let Some((username, password)) = body.credentials() else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "username and password are required",
        );
    };
    let username = username.to_string();
    let password = password.to_string();

    // Password hashing is CPU-bound; keep it off the async workers.
    let outcome = {
        let username = username.clone();
        tokio::task::spawn_blocking(move || gate.login(&username, &password)).await
    };

    match outcome {
        Ok(Ok(token)) => (
            StatusCode::OK,
            Json(dto::LoginResponse {
                success: true,
                message: format!("Welcome {username}!"),
                token: token.expose().to_string(),
                username,
            }),
        )
            .into_response(),
        Ok(Err(e)) => errors::crm_error_to_response(e),
        Err(e) => {
            tracing::error!(error = %e, "login task failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "login failed")
        }
    }
}

/// Ends the presented session, if any. Always 204.
pub async fn logout(Extension(gate): Extension<Arc<AccessGate>>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = extract_bearer(&headers) {
        gate.logout(token);
    }
    StatusCode::NO_CONTENT
}
