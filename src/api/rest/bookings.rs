use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, Location, PaymentMethod};
use crate::models::user::Role;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/pending", get(list_pending))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/accept", post(accept_booking))
        .route("/bookings/:id/start", post(start_booking))
        .route("/bookings/:id/complete", post(complete_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/rate", post(rate_booking))
        .route("/customers/:id/bookings", get(list_customer_bookings))
        .route("/drivers/:id/bookings", get(list_driver_bookings))
        .route("/admin/bookings", get(list_all_bookings))
        .route("/admin/stats", get(stats))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub pickup: Location,
    pub delivery: Location,
    pub vehicle_type: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let customer = state
        .users
        .get(payload.customer_id)
        .ok_or(AppError::UserNotFound(payload.customer_id))?;
    if customer.role != Role::Customer {
        return Err(AppError::BadRequest(
            "only customers can create bookings".to_string(),
        ));
    }

    let booking = dispatch::create_booking(
        &state,
        payload.customer_id,
        payload.pickup,
        payload.delivery,
        &payload.vehicle_type,
        payload.payment_method,
    )?;

    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .get(id)
        .ok_or(AppError::BookingNotFound(id))?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct PendingQuery {
    pub vehicle_type: Option<String>,
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendingQuery>,
) -> Json<Vec<Booking>> {
    Json(state.bookings.list_pending(query.vehicle_type.as_deref()))
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub driver_id: Uuid,
}

/// The driver eligibility gate lives here, at the boundary; the engine's
/// compare-and-swap alone decides the race between eligible drivers.
async fn accept_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<Booking>, AppError> {
    let driver = state
        .users
        .get(payload.driver_id)
        .ok_or(AppError::UserNotFound(payload.driver_id))?;
    let booking = state
        .bookings
        .get(id)
        .ok_or(AppError::BookingNotFound(id))?;

    if !driver.is_eligible_driver(&booking.vehicle_type) {
        return Err(AppError::BadRequest(
            "driver is not eligible for this booking".to_string(),
        ));
    }

    let booking = dispatch::accept(&state, id, &driver)?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub code: String,
}

async fn start_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = dispatch::start(&state, id, &payload.code)?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub driver_id: Uuid,
}

async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = dispatch::complete(&state, id, payload.driver_id)?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub actor_id: Uuid,
    pub reason: Option<String>,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    // cancellation is open to either party; the actor only has to exist
    state
        .users
        .get(payload.actor_id)
        .ok_or(AppError::UserNotFound(payload.actor_id))?;

    let booking = dispatch::cancel(&state, id, payload.reason)?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub customer_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
}

async fn rate_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = dispatch::rate(
        &state,
        id,
        payload.customer_id,
        payload.rating,
        payload.comment,
    )?;
    Ok(Json(booking))
}

async fn list_customer_bookings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<Booking>> {
    Json(state.bookings.list_by_customer(id))
}

async fn list_driver_bookings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<Booking>> {
    Json(state.bookings.list_by_driver(id))
}

async fn list_all_bookings(State(state): State<Arc<AppState>>) -> Json<Vec<Booking>> {
    Json(state.bookings.list_all())
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_users: usize,
    pub total_customers: usize,
    pub total_drivers: usize,
    pub online_drivers: usize,
    pub total_bookings: usize,
    pub completed_bookings: usize,
    pub active_bookings: usize,
    pub cancelled_bookings: usize,
    pub total_revenue: u64,
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let users = state.users.list_all();
    let bookings = state.bookings.list_all();

    let completed: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .collect();

    Json(StatsResponse {
        total_users: users.iter().filter(|u| u.role != Role::Admin).count(),
        total_customers: users.iter().filter(|u| u.role == Role::Customer).count(),
        total_drivers: users.iter().filter(|u| u.role == Role::Driver).count(),
        online_drivers: users
            .iter()
            .filter(|u| u.role == Role::Driver && u.is_online)
            .count(),
        total_bookings: bookings.len(),
        completed_bookings: completed.len(),
        active_bookings: bookings.iter().filter(|b| !b.status.is_terminal()).count(),
        cancelled_bookings: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Cancelled)
            .count(),
        total_revenue: completed.iter().map(|b| u64::from(b.total_price)).sum(),
    })
}
