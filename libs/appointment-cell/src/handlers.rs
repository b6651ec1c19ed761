// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppointmentListQuery, BookAppointmentRequest, UpdateAppointmentRequest};
use crate::services::booking::AppointmentService;

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(service): State<Arc<AppointmentService>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller_id = user.caller_id()?;
    let appointment = service.book(caller_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

// ==============================================================================
// READS
// ==============================================================================

pub async fn list_appointments(
    State(service): State<Arc<AppointmentService>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let caller_id = user.caller_id()?;
    let appointments = service.list(caller_id, &query).await?;

    Ok(Json(json!(appointments)))
}

pub async fn get_appointment(
    State(service): State<Arc<AppointmentService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller_id = user.caller_id()?;
    let (appointment, _role) = service.get(caller_id, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// TRANSITIONS
// ==============================================================================

pub async fn update_appointment(
    State(service): State<Arc<AppointmentService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let caller_id = user.caller_id()?;
    let appointment = service.update(caller_id, appointment_id, request).await?;

    Ok(Json(json!(appointment)))
}

/// Soft cancel; the row is kept with status `canceled`.
pub async fn cancel_appointment(
    State(service): State<Arc<AppointmentService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller_id = user.caller_id()?;
    let appointment = service.cancel(caller_id, appointment_id).await?;

    Ok(Json(json!(appointment)))
}
