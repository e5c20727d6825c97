use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};

use crmdesk_gate::{AccessGate, Caller};
use crmdesk_records::{FieldMap, RecordKind};

use crate::app::errors;

/// Collection routes for one kind; handlers read the kind from an extension.
pub fn router(kind: RecordKind) -> Router {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .layer(Extension(kind))
}

pub async fn list_records(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
    Extension(kind): Extension<RecordKind>,
) -> axum::response::Response {
    let records = gate.list(&caller, kind);
    let mut body = Map::new();
    match serde_json::to_value(records) {
        Ok(list) => {
            body.insert(kind.plural().to_string(), list);
            Json(Value::Object(body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, kind = kind.as_str(), "failed to encode records");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "failed to encode records")
        }
    }
}

pub async fn create_record(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
    Extension(kind): Extension<RecordKind>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response {
    let fields = match field_map(body) {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };

    match gate.create(&caller, kind, &fields) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::crm_error_to_response(e),
    }
}

/// Accept only a JSON object; anything else is a 400.
pub(crate) fn field_map(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<FieldMap, axum::response::Response> {
    match body {
        Ok(Json(Value::Object(fields))) => Ok(fields),
        Ok(Json(_)) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "request body must be a JSON object",
        )),
        Err(rejection) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            rejection.body_text(),
        )),
    }
}
