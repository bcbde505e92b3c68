use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("booking not found")]
    NotFound,

    #[error("booking status is {0}, not the expected prior status")]
    StatusMismatch(BookingStatus),
}

/// Bookings keyed by id. `conditional_transition` is the only mutation path
/// for status: it holds the DashMap entry lock for the duration of the
/// check-and-write, so concurrent callers observing the same prior status
/// resolve to exactly one winner.
#[derive(Default)]
pub struct BookingStore {
    bookings: DashMap<Uuid, Booking>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn get(&self, id: Uuid) -> Option<Booking> {
        self.bookings.get(&id).map(|b| b.clone())
    }

    /// Compare-and-swap on status. Fails without mutating unless the current
    /// status equals `from`; otherwise applies `mutate`, writes `to`, and
    /// returns the updated record.
    pub fn conditional_transition<F>(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        mutate: F,
    ) -> Result<Booking, TransitionError>
    where
        F: FnOnce(&mut Booking),
    {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Err(TransitionError::NotFound);
        };
        if booking.status != from {
            return Err(TransitionError::StatusMismatch(booking.status));
        }
        mutate(&mut booking);
        booking.status = to;
        Ok(booking.clone())
    }

    pub fn list_by_customer(&self, customer_id: Uuid) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| entry.value().customer_id == customer_id)
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    pub fn list_by_driver(&self, driver_id: Uuid) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| entry.value().driver_id == Some(driver_id))
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    pub fn list_pending(&self, vehicle_type: Option<&str>) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|entry| {
                let booking = entry.value();
                booking.status == BookingStatus::Pending
                    && vehicle_type.is_none_or(|vt| booking.vehicle_type == vt)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn list_all(&self) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}
