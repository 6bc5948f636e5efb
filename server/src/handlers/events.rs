use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::handlers::form::EventForm;
use crate::models::EventResponse;
use crate::services::Pagination;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, message, success};

/// Query of `GET /events`. Numbers are kept as text so that parse failures
/// surface as regular JSON errors.
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

/// `GET /events`: a lookup when `id` is present, the latest listing otherwise.
pub async fn get_events(
    State(state): State<AppState>,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::invalid(e.body_text()))?;

    if query.id.is_some() {
        let event = state.events.get_by_id(query.id.as_deref()).await?;
        return Ok(success(EventResponse::from(event)));
    }

    let pagination = Pagination::parse(query.limit.as_deref(), query.page.as_deref())?;
    let events = state
        .events
        .list_latest(query.event_type.as_deref(), pagination)
        .await?;

    Ok(success(
        events
            .into_iter()
            .map(EventResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// `POST /events`
pub async fn create_event(
    State(state): State<AppState>,
    EventForm(fields): EventForm,
) -> Result<Response, AppError> {
    let id = state.events.create(fields).await?;
    Ok(created("Event created successfully", id.to_hex()))
}

/// `PUT /events/:id`
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    EventForm(fields): EventForm,
) -> Result<Response, AppError> {
    state.events.update(&id, fields).await?;
    Ok(message("Event updated successfully"))
}

/// `DELETE /events/:id`
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    state.events.delete(&id).await?;
    Ok(message("Event deleted successfully"))
}
