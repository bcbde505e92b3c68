use dashmap::DashMap;
use uuid::Uuid;

use crate::models::user::{Role, User};

/// Users keyed by id. Phone numbers are unique; lookups by phone scan the
/// map, which is fine at this scale.
#[derive(Default)]
pub struct UserStore {
    users: DashMap<Uuid, User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn get_by_phone(&self, phone: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.value().phone == phone)
            .map(|entry| entry.value().clone())
    }

    /// Applies `mutate` under the entry lock and returns the updated user.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut user = self.users.get_mut(&id)?;
        mutate(&mut user);
        Some(user.clone())
    }

    /// Trip-count and earnings accrual on completion. The entry lock
    /// serializes concurrent increments for the same driver.
    pub fn accrue_trip(&self, driver_id: Uuid, earnings: u32) -> Option<User> {
        let mut driver = self.users.get_mut(&driver_id)?;
        driver.total_trips += 1;
        driver.total_earnings += u64::from(earnings);
        Some(driver.clone())
    }

    /// Approved, online drivers, optionally filtered by vehicle type.
    pub fn online_drivers(&self, vehicle_type: Option<&str>) -> Vec<User> {
        self.users
            .iter()
            .filter(|entry| {
                let user = entry.value();
                user.role == Role::Driver
                    && user.is_online
                    && user.is_approved
                    && vehicle_type.is_none_or(|vt| user.vehicle_type.as_deref() == Some(vt))
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn list_all(&self) -> Vec<User> {
        self.users.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
