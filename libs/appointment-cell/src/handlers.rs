// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::ids::EntityId;
use shared_utils::extractor::require_admin;

use crate::models::{AppointmentError, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::appointments::AppointmentService;
use crate::services::query::AppointmentQuery;

fn actor_id(user: &User) -> Result<EntityId, AppError> {
    EntityId::parse(&user.id)
        .map_err(|_| AppError::Auth("Resolved identity carries an invalid id".to_string()))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AppointmentQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = AppointmentService::new(&state);

    let page = service
        .list_appointments(query)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "appointments": page.appointments,
        "total_count": page.total_count,
        "total_pages": page.total_pages,
        "current_page": page.current_page
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = AppointmentService::new(&state);

    let view = service
        .get_appointment(appointment_id.into())
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Database(e.to_string()),
        })?;

    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let actor = actor_id(&user)?;

    let service = AppointmentService::new(&state);

    let appointment = service
        .create_appointment(request, actor)
        .await
        .map_err(|e| match e {
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment created successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let actor = actor_id(&user)?;

    let service = AppointmentService::new(&state);

    let appointment = service
        .update_appointment(appointment_id.into(), request, actor)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let actor = actor_id(&user)?;

    let service = AppointmentService::new(&state);

    service
        .delete_appointment(appointment_id.into(), actor)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}
