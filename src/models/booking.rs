use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub area: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Completed and cancelled bookings admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
}

/// A single pickup-to-delivery job. Price components and the pickup code are
/// fixed at creation; driver fields are written exactly once, on acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub driver_vehicle_number: Option<String>,
    pub pickup: Location,
    pub delivery: Location,
    pub vehicle_type: String,
    /// Great-circle estimate in km, one decimal place.
    pub distance: f64,
    pub base_price: u32,
    pub distance_charge: u32,
    pub total_price: u32,
    /// Minutes.
    pub estimated_time: u32,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    /// 4-digit code the customer shows the driver at pickup.
    pub pickup_code: String,
    pub rating: Option<u8>,
    pub rating_comment: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}
