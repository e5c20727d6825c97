use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crmdesk_core::CrmError;

/// Map a core error to an HTTP response.
///
/// `Forbidden` and `NotFound` produce byte-identical responses, as do the two
/// authentication failures within their own pair.
pub fn crm_error_to_response(err: CrmError) -> axum::response::Response {
    match err {
        CrmError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
        }
        CrmError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "Invalid credentials")
        }
        CrmError::Forbidden | CrmError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "record not found")
        }
        CrmError::InvalidRecord(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CrmError::DuplicateIdentity => json_error(StatusCode::CONFLICT, "conflict", "identity already exists"),
        CrmError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "internal storage error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
