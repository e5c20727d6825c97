//! Single-candidate routes. Candidates are the only mutable kind.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crmdesk_gate::{AccessGate, Caller};
use crmdesk_records::RecordKind;

use crate::app::errors;
use crate::app::routes::records::field_map;

pub fn router() -> Router {
    Router::new().route(
        "/:id",
        get(get_candidate).patch(update_candidate).delete(delete_candidate),
    )
}

pub async fn get_candidate(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match gate.get(&caller, RecordKind::Candidate, &id) {
        Ok(record) => Json(record).into_response(),
        Err(e) => errors::crm_error_to_response(e),
    }
}

pub async fn update_candidate(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response {
    let patch = match field_map(body) {
        Ok(patch) => patch,
        Err(resp) => return resp,
    };

    match gate.update_candidate(&caller, &id, &patch) {
        Ok(record) => Json(record).into_response(),
        Err(e) => errors::crm_error_to_response(e),
    }
}

pub async fn delete_candidate(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match gate.delete_candidate(&caller, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::crm_error_to_response(e),
    }
}
