use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod events;
pub mod form;

pub use events::{create_event, delete_event, get_events, update_event};
pub use form::EventForm;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    success(HealthPayload {
        status: "ok",
        service: "events-api",
    })
}
