use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Driver,
    Admin,
}

/// Default aggregate rating assigned to a newly registered driver.
pub const DEFAULT_DRIVER_RATING: f64 = 4.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    pub is_online: bool,
    pub is_approved: bool,
    pub rating: f64,
    pub total_trips: u32,
    pub total_earnings: u64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Drivers are eligible for dispatch only once approved and online.
    pub fn is_eligible_driver(&self, vehicle_type: &str) -> bool {
        self.role == Role::Driver
            && self.is_online
            && self.is_approved
            && self.vehicle_type.as_deref() == Some(vehicle_type)
    }
}
