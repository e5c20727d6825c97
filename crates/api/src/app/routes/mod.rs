use axum::{routing::get, Router};

use crmdesk_records::RecordKind;

pub mod auth;
pub mod candidates;
pub mod dashboard;
pub mod records;
pub mod system;

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/dashboard", get(dashboard::dashboard))
        .nest("/customers", records::router(RecordKind::Customer))
        .nest("/leads", records::router(RecordKind::Lead))
        .nest("/sales", records::router(RecordKind::Sale))
        .nest(
            "/candidates",
            records::router(RecordKind::Candidate).merge(candidates::router()),
        )
}

