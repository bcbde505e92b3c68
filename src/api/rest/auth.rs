use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{Role, User, DEFAULT_DRIVER_RATING};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/verify-otp", post(verify_otp))
}

#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub phone: String,
}

#[derive(Serialize)]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: &'static str,
    /// No SMS gateway is wired up; the code is returned to the caller
    /// so the client can display it during development.
    pub otp: String,
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, AppError> {
    if payload.phone.len() < 10 {
        return Err(AppError::BadRequest(
            "valid phone number required".to_string(),
        ));
    }

    let otp = state.login_codes.issue(&payload.phone, state.login_code_ttl);
    debug!(phone = %payload.phone, "login code issued");

    Ok(Json(SendOtpResponse {
        success: true,
        message: "OTP sent successfully",
        otp,
    }))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
    pub role: Option<Role>,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub user: User,
    pub is_new: bool,
}

/// Verifies a login code and returns the matching user, creating a bare
/// record on first login. New customers are approved immediately; drivers
/// wait for admin approval.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    if !state.login_codes.verify(&payload.phone, &payload.otp) {
        return Err(AppError::BadRequest(
            "invalid or expired OTP, request a new one".to_string(),
        ));
    }

    if let Some(user) = state.users.get_by_phone(&payload.phone) {
        return Ok(Json(VerifyOtpResponse {
            success: true,
            user,
            is_new: false,
        }));
    }

    let role = payload.role.unwrap_or(Role::Customer);
    let user = User {
        id: Uuid::new_v4(),
        name: String::new(),
        phone: payload.phone,
        role,
        vehicle_type: None,
        vehicle_number: None,
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
    info!(user_id = %user.id, "user created on first login");

    Ok(Json(VerifyOtpResponse {
        success: true,
        user,
        is_new: true,
    }))
}
