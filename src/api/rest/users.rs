use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::events::DispatchEvent;
use crate::models::user::{Role, User, DEFAULT_DRIVER_RATING};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/online", patch(toggle_online))
        .route("/users/:id/approve", patch(approve_driver))
        .route("/drivers/online", get(list_online_drivers))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
}

/// Registers a user, or updates the profile when the phone number is already
/// known. Phone numbers are unique; re-registering never duplicates.
async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.phone.len() < 10 {
        return Err(AppError::BadRequest(
            "valid phone number required".to_string(),
        ));
    }

    if let Some(existing) = state.users.get_by_phone(&payload.phone) {
        let updated = state
            .users
            .update(existing.id, |user| {
                user.name = payload.name.clone();
                if let Some(role) = payload.role {
                    user.role = role;
                    user.is_approved = role == Role::Customer;
                }
                user.vehicle_type = payload.vehicle_type.clone();
                user.vehicle_number = payload.vehicle_number.clone();
            })
            .ok_or(AppError::UserNotFound(existing.id))?;
        return Ok(Json(updated));
    }

    let role = payload.role.unwrap_or(Role::Customer);
    let user = User {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        role,
        vehicle_type: payload.vehicle_type,
        vehicle_number: payload.vehicle_number,
        is_online: false,
        is_approved: role == Role::Customer,
        rating: if role == Role::Driver {
            DEFAULT_DRIVER_RATING
        } else {
            0.0
        },
        total_trips: 0,
        total_earnings: 0,
        created_at: Utc::now(),
    };

    state.users.insert(user.clone());
    info!(user_id = %user.id, role = ?user.role, "user registered");

    Ok(Json(user))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state.users.get(id).ok_or(AppError::UserNotFound(id))?;
    Ok(Json(user))
}

/// Flips a driver's online flag and announces the change on the bus so
/// customers see availability move in real time.
async fn toggle_online(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state.users.get(id).ok_or(AppError::UserNotFound(id))?;
    if user.role != Role::Driver {
        return Err(AppError::BadRequest(
            "only drivers can go online".to_string(),
        ));
    }

    let updated = state
        .users
        .update(id, |user| user.is_online = !user.is_online)
        .ok_or(AppError::UserNotFound(id))?;

    state.events.publish(DispatchEvent::DriverStatus {
        driver_id: id,
        is_online: updated.is_online,
    });
    info!(driver_id = %id, is_online = updated.is_online, "driver status changed");

    Ok(Json(updated))
}

/// Admin approval gate: unapproved drivers never see pending bookings.
async fn approve_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let updated = state
        .users
        .update(id, |user| user.is_approved = true)
        .ok_or(AppError::UserNotFound(id))?;

    info!(driver_id = %id, "driver approved");

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct OnlineDriversQuery {
    pub vehicle_type: Option<String>,
}

async fn list_online_drivers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OnlineDriversQuery>,
) -> Json<Vec<User>> {
    Json(state.users.online_drivers(query.vehicle_type.as_deref()))
}
