use serde::{Deserialize, Serialize};

/// Static per-vehicle-type fare parameters. Admin-editable; inactive types
/// are not offered for new bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehiclePricing {
    pub vehicle_type: String,
    pub name: String,
    pub base_fare: u32,
    pub per_km_charge: u32,
    pub capacity: String,
    pub is_active: bool,
}
