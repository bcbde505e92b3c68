use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use tracing::info;

use crate::error::AppError;
use crate::models::vehicle::VehiclePricing;
use crate::state::AppState;
use crate::store::pricing::PricingUpdate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles", get(list_active_vehicles))
        .route("/admin/vehicles", get(list_all_vehicles))
        .route("/admin/vehicles/:vehicle_type", put(update_vehicle))
}

async fn list_active_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<VehiclePricing>> {
    Json(state.pricing.list_active())
}

async fn list_all_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<VehiclePricing>> {
    Json(state.pricing.list_all())
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    Path(vehicle_type): Path<String>,
    Json(patch): Json<PricingUpdate>,
) -> Result<Json<VehiclePricing>, AppError> {
    let updated = state
        .pricing
        .update(&vehicle_type, patch)
        .ok_or_else(|| AppError::InvalidVehicleType(vehicle_type.clone()))?;

    info!(vehicle_type, "vehicle pricing updated");

    Ok(Json(updated))
}
