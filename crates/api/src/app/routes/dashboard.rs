use std::sync::Arc;

use axum::{extract::Extension, Json};

use crmdesk_gate::{AccessGate, Caller};

use crate::app::dto;

pub async fn dashboard(
    Extension(gate): Extension<Arc<AccessGate>>,
    Extension(caller): Extension<Caller>,
) -> Json<dto::DashboardResponse> {
    Json(dto::DashboardResponse {
        username: caller.username().to_string(),
        stats: gate.dashboard(&caller),
    })
}
