use dashmap::DashMap;
use serde::Deserialize;

use crate::models::vehicle::VehiclePricing;

/// Partial update applied by admins; absent fields are left untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingUpdate {
    pub base_fare: Option<u32>,
    pub per_km_charge: Option<u32>,
    pub is_active: Option<bool>,
}

/// Per-vehicle-type fare table. Read-only from the dispatch engine's
/// perspective apart from the is_active gate.
pub struct PricingTable {
    vehicles: DashMap<String, VehiclePricing>,
}

impl PricingTable {
    pub fn with_defaults() -> Self {
        let table = Self {
            vehicles: DashMap::new(),
        };
        for vehicle in default_vehicles() {
            table.vehicles.insert(vehicle.vehicle_type.clone(), vehicle);
        }
        table
    }

    /// Fare parameters for an active type; `None` for unknown or
    /// deactivated types.
    pub fn get_active(&self, vehicle_type: &str) -> Option<VehiclePricing> {
        self.vehicles
            .get(vehicle_type)
            .filter(|v| v.is_active)
            .map(|v| v.clone())
    }

    pub fn list_active(&self) -> Vec<VehiclePricing> {
        self.vehicles
            .iter()
            .filter(|entry| entry.value().is_active)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn list_all(&self) -> Vec<VehiclePricing> {
        self.vehicles
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn update(&self, vehicle_type: &str, patch: PricingUpdate) -> Option<VehiclePricing> {
        let mut vehicle = self.vehicles.get_mut(vehicle_type)?;
        if let Some(base_fare) = patch.base_fare {
            vehicle.base_fare = base_fare;
        }
        if let Some(per_km_charge) = patch.per_km_charge {
            vehicle.per_km_charge = per_km_charge;
        }
        if let Some(is_active) = patch.is_active {
            vehicle.is_active = is_active;
        }
        Some(vehicle.clone())
    }
}

fn default_vehicles() -> Vec<VehiclePricing> {
    vec![
        VehiclePricing {
            vehicle_type: "auto".to_string(),
            name: "Auto".to_string(),
            base_fare: 50,
            per_km_charge: 12,
            capacity: "Up to 200kg".to_string(),
            is_active: true,
        },
        VehiclePricing {
            vehicle_type: "tempo".to_string(),
            name: "Tempo".to_string(),
            base_fare: 150,
            per_km_charge: 18,
            capacity: "Up to 1000kg".to_string(),
            is_active: true,
        },
        VehiclePricing {
            vehicle_type: "truck".to_string(),
            name: "Truck".to_string(),
            base_fare: 300,
            per_km_charge: 25,
            capacity: "1000kg+".to_string(),
            is_active: true,
        },
    ]
}
