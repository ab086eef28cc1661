use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use super::access::{require, require_with};
use crate::auth::{Action, RequireSession};
use crate::error::Error;
use crate::events::{EventPatch, NewEvent};
use crate::server::AppState;
use crate::server::dto::{
    BulkEventsRequest, EventRequest, EventResponse, EventsResponse, SuccessResponse,
};
use crate::server::response::{ApiError, JsonBody, StoreOptionExt, StoreResultExt};
use crate::server::validation::{EVENT_STATUSES, FieldErrors, PAYMENT_STATUSES};
use crate::types::Contact;

fn check_formats(errors: &mut FieldErrors, req: &EventRequest) {
    errors.date(req.date.as_deref(), "date");
    errors.time(req.start_time.as_deref(), "startTime");
    errors.time(req.end_time.as_deref(), "endTime");
    errors.one_of(req.status.as_deref(), "status", &EVENT_STATUSES);
    errors.one_of(req.payment_status.as_deref(), "paymentStatus", &PAYMENT_STATUSES);
}

fn new_event(req: EventRequest) -> Result<NewEvent, ApiError> {
    let mut errors = FieldErrors::default();

    let title = errors.required(req.title.as_deref(), "title").map(str::to_string);
    let venue = errors.required(req.venue.as_deref(), "venue").map(str::to_string);
    errors.required(req.date.as_deref(), "date");
    errors.required(req.start_time.as_deref(), "startTime");
    errors.required(req.end_time.as_deref(), "endTime");
    errors.required(req.status.as_deref(), "status");
    errors.required(req.payment_status.as_deref(), "paymentStatus");
    check_formats(&mut errors, &req);
    let created_at = errors.timestamp(req.created_at.as_deref(), "createdAt");
    let updated_at = errors.timestamp(req.updated_at.as_deref(), "updatedAt");
    errors.into_result("Invalid event")?;

    let contact = req.contact.unwrap_or_default();
    Ok(NewEvent {
        id: req.id.filter(|id| !id.trim().is_empty()),
        title: title.unwrap_or_default(),
        venue: venue.unwrap_or_default(),
        venue_id: req.venue_id,
        color: req.color,
        date: req.date.unwrap_or_default(),
        start_time: req.start_time.unwrap_or_default(),
        end_time: req.end_time.unwrap_or_default(),
        status: req.status.unwrap_or_default(),
        payment_status: req.payment_status.unwrap_or_default(),
        payment_method: req.payment_method,
        contact: Contact {
            name: contact.name.unwrap_or_default(),
            phone: contact.phone.unwrap_or_default(),
            email: contact.email.unwrap_or_default(),
        },
        pricing: req.pricing.filter(|p| !p.is_null()),
        notes: req.notes,
        created_at,
        updated_at,
    })
}

fn event_patch(req: EventRequest) -> Result<EventPatch, ApiError> {
    let mut errors = FieldErrors::default();
    check_formats(&mut errors, &req);
    errors.into_result("Invalid event")?;

    let contact = req.contact.unwrap_or_default();
    Ok(EventPatch {
        title: req.title,
        venue: req.venue,
        venue_id: req.venue_id,
        color: req.color,
        date: req.date,
        start_time: req.start_time,
        end_time: req.end_time,
        status: req.status,
        payment_status: req.payment_status,
        payment_method: req.payment_method,
        contact_name: contact.name,
        contact_phone: contact.phone,
        contact_email: contact.email,
        pricing: req.pricing.filter(|p| !p.is_null()),
        notes: req.notes,
    })
}

pub async fn list_events(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<EventsResponse>, ApiError> {
    require(&session.user, Action::ReadEvents, None)?;

    let events = state
        .events
        .list(&session.tenant)
        .api_err("Failed to list events")?;

    Ok(Json(EventsResponse { events }))
}

pub async fn create_event(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<EventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    require(&session.user, Action::WriteEvents, None)?;

    let input = new_event(req)?;
    let event = state
        .events
        .create(&session.tenant, &session.user, input)
        .map_err(|e| match e {
            Error::AlreadyExists => ApiError::bad_request("Event ID already exists"),
            other => ApiError::internal("Failed to create event").with_details(other),
        })?;

    Ok((StatusCode::CREATED, Json(EventResponse { event })))
}

pub async fn bulk_create_events(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<BulkEventsRequest>,
) -> Result<(StatusCode, Json<EventsResponse>), ApiError> {
    require(&session.user, Action::WriteEvents, None)?;

    let inputs = req
        .events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            new_event(event).map_err(|e| ApiError {
                errors: e
                    .errors
                    .into_iter()
                    .map(|message| format!("events[{i}]: {message}"))
                    .collect(),
                ..e
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let events = state
        .events
        .bulk_create(&session.tenant, &session.user, inputs)
        .map_err(|e| match e {
            Error::AlreadyExists => ApiError::bad_request("Event ID already exists"),
            other => ApiError::internal("Failed to import events").with_details(other),
        })?;

    Ok((StatusCode::CREATED, Json(EventsResponse { events })))
}

pub async fn update_event(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<EventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    require(&session.user, Action::WriteEvents, None)?;

    let patch = event_patch(req)?;
    let event = state
        .events
        .update(&session.tenant, &session.user, &id, patch)
        .api_err("Failed to update event")?
        .or_not_found("Event not found")?;

    Ok(Json(EventResponse { event }))
}

pub async fn delete_event(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require(&session.user, Action::DeleteEvents, None)?;

    if !state
        .events
        .delete(&session.tenant, &id)
        .api_err("Failed to delete event")?
    {
        return Err(ApiError::not_found("Event not found"));
    }

    Ok(Json(SuccessResponse::ok()))
}

pub async fn clear_events(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_with(
        &session.user,
        Action::DeleteEvents,
        None,
        "Only admin or manager can clear events",
    )?;

    state
        .events
        .clear(&session.tenant)
        .api_err("Failed to clear events")?;

    Ok(Json(SuccessResponse::ok()))
}

pub async fn export_events(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.user, Action::ReadEvents, None)?;

    let csv = state
        .events
        .export_csv(&session.tenant)
        .api_err("Failed to export events")?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"events.csv\""),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> EventRequest {
        EventRequest {
            title: Some("Gala".to_string()),
            venue: Some("Main Hall".to_string()),
            date: Some("2025-06-01".to_string()),
            start_time: Some("18:00".to_string()),
            end_time: Some("23:00".to_string()),
            status: Some("pending".to_string()),
            payment_status: Some("unpaid".to_string()),
            ..EventRequest::default()
        }
    }

    #[test]
    fn test_new_event_accepts_valid_request() {
        let event = new_event(valid_request()).unwrap();
        assert_eq!(event.title, "Gala");
        assert!(event.id.is_none());
        assert!(event.created_at.is_none());
    }

    #[test]
    fn test_new_event_reports_every_problem() {
        let req = EventRequest {
            title: None,
            date: Some("01/06/2025".to_string()),
            status: Some("tentative".to_string()),
            created_at: Some("yesterday".to_string()),
            ..valid_request()
        };

        let err = new_event(req).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.errors.len(), 4);
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        let patch = event_patch(EventRequest {
            status: Some("confirmed".to_string()),
            ..EventRequest::default()
        })
        .unwrap();
        assert_eq!(patch.status.as_deref(), Some("confirmed"));
        assert!(patch.title.is_none());

        let bad = event_patch(EventRequest {
            end_time: Some("late".to_string()),
            ..EventRequest::default()
        });
        assert!(bad.is_err());
    }
}
