//! The booking state machine: pending → accepted → in_progress → completed,
//! with cancellation possible from pending or accepted. Every status write
//! goes through [`BookingStore::conditional_transition`]; the engine holds no
//! state of its own.

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::events::DispatchEvent;
use crate::geo;
use crate::models::booking::{Booking, BookingStatus, Location, PaymentMethod};
use crate::models::user::User;
use crate::state::AppState;
use crate::store::bookings::{BookingStore, TransitionError};

/// Pickup codes have no meaningful deadline of their own; they are valid for
/// as long as the booking can plausibly still start.
const PICKUP_CODE_TTL_DAYS: i64 = 365;

/// Prices a new job, mints its pickup code, and exposes it to drivers as
/// `pending`. Price components are computed once here and never recomputed.
pub fn create_booking(
    state: &AppState,
    customer_id: Uuid,
    pickup: Location,
    delivery: Location,
    vehicle_type: &str,
    payment_method: PaymentMethod,
) -> Result<Booking, AppError> {
    let pricing = state
        .pricing
        .get_active(vehicle_type)
        .ok_or_else(|| AppError::InvalidVehicleType(vehicle_type.to_string()))?;
    let customer = state
        .users
        .get(customer_id)
        .ok_or(AppError::UserNotFound(customer_id))?;

    let distance = geo::estimate_km(&pickup, &delivery);
    let distance_charge = (distance * f64::from(pricing.per_km_charge)).round() as u32;
    let total_price = pricing.base_fare + distance_charge;
    let estimated_time = (distance * 3.0 + 5.0).round() as u32;

    let id = Uuid::new_v4();
    let pickup_code = state
        .pickup_codes
        .issue(&id.to_string(), Duration::days(PICKUP_CODE_TTL_DAYS));

    let booking = Booking {
        id,
        customer_id,
        customer_name: customer.name,
        customer_phone: customer.phone,
        driver_id: None,
        driver_name: None,
        driver_phone: None,
        driver_vehicle_number: None,
        pickup,
        delivery,
        vehicle_type: vehicle_type.to_string(),
        distance,
        base_price: pricing.base_fare,
        distance_charge,
        total_price,
        estimated_time,
        payment_method,
        status: BookingStatus::Pending,
        pickup_code,
        rating: None,
        rating_comment: None,
        cancel_reason: None,
        created_at: Utc::now(),
        accepted_at: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
    };

    state.bookings.insert(booking.clone());
    state
        .metrics
        .booking_transitions_total
        .with_label_values(&["pending"])
        .inc();
    state.metrics.pending_bookings.inc();
    state.events.publish(DispatchEvent::BookingCreated {
        booking: booking.clone(),
    });

    info!(
        booking_id = %booking.id,
        vehicle_type,
        distance_km = distance,
        total_price,
        "booking created"
    );

    Ok(booking)
}

/// Claims a pending booking for `driver`. Under concurrent attempts the
/// per-booking compare-and-swap lets exactly one caller through; everyone
/// else gets `BookingAlreadyTaken` and is expected to re-poll the pending
/// list. Driver snapshot fields are written here, exactly once.
pub fn accept(state: &AppState, booking_id: Uuid, driver: &User) -> Result<Booking, AppError> {
    let result = state.bookings.conditional_transition(
        booking_id,
        BookingStatus::Pending,
        BookingStatus::Accepted,
        |booking| {
            booking.driver_id = Some(driver.id);
            booking.driver_name = Some(driver.name.clone());
            booking.driver_phone = Some(driver.phone.clone());
            booking.driver_vehicle_number = driver.vehicle_number.clone();
            booking.accepted_at = Some(Utc::now());
        },
    );

    let booking = match result {
        Ok(booking) => booking,
        Err(TransitionError::NotFound) => return Err(AppError::BookingNotFound(booking_id)),
        Err(TransitionError::StatusMismatch(_)) => {
            state
                .metrics
                .accept_attempts_total
                .with_label_values(&["lost"])
                .inc();
            return Err(AppError::BookingAlreadyTaken);
        }
    };

    state
        .metrics
        .accept_attempts_total
        .with_label_values(&["won"])
        .inc();
    state
        .metrics
        .booking_transitions_total
        .with_label_values(&["accepted"])
        .inc();
    state.metrics.pending_bookings.dec();
    state.events.publish(DispatchEvent::BookingUpdated {
        booking: booking.clone(),
    });

    info!(booking_id = %booking.id, driver_id = %driver.id, "booking accepted");

    Ok(booking)
}

/// Starts the trip once the driver submits the code the customer shows at
/// pickup. The code is single-use: a successful start consumes it, and a
/// wrong or expired code leaves the booking in `accepted`.
pub fn start(state: &AppState, booking_id: Uuid, submitted_code: &str) -> Result<Booking, AppError> {
    let booking = state
        .bookings
        .get(booking_id)
        .ok_or(AppError::BookingNotFound(booking_id))?;
    if booking.status != BookingStatus::Accepted {
        return Err(AppError::InvalidState(format!(
            "cannot start a {} booking",
            booking.status
        )));
    }

    if !state
        .pickup_codes
        .verify(&booking_id.to_string(), submitted_code)
    {
        return Err(AppError::InvalidCode);
    }

    let booking = transition(
        &state.bookings,
        booking_id,
        BookingStatus::Accepted,
        BookingStatus::InProgress,
        |booking| booking.started_at = Some(Utc::now()),
    )?;

    state
        .metrics
        .booking_transitions_total
        .with_label_values(&["in_progress"])
        .inc();
    state.events.publish(DispatchEvent::BookingUpdated {
        booking: booking.clone(),
    });

    info!(booking_id = %booking.id, "trip started");

    Ok(booking)
}

/// Finishes the trip and accrues the fare to the driver. The accrual is a
/// read-modify-write under the driver's entry lock, and the status CAS
/// guarantees it happens at most once per booking.
pub fn complete(state: &AppState, booking_id: Uuid, driver_id: Uuid) -> Result<Booking, AppError> {
    let current = state
        .bookings
        .get(booking_id)
        .ok_or(AppError::BookingNotFound(booking_id))?;
    if current.driver_id != Some(driver_id) {
        return Err(AppError::InvalidState(
            "booking is not assigned to this driver".to_string(),
        ));
    }

    let booking = transition(
        &state.bookings,
        booking_id,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        |booking| booking.completed_at = Some(Utc::now()),
    )?;

    state.users.accrue_trip(driver_id, booking.total_price);

    state
        .metrics
        .booking_transitions_total
        .with_label_values(&["completed"])
        .inc();
    state
        .metrics
        .completed_revenue_total
        .inc_by(u64::from(booking.total_price));
    state.events.publish(DispatchEvent::BookingUpdated {
        booking: booking.clone(),
    });

    info!(
        booking_id = %booking.id,
        driver_id = %driver_id,
        fare = booking.total_price,
        "trip completed"
    );

    Ok(booking)
}

/// Cancels a booking that has not yet started. Terminal bookings and
/// in-progress trips are rejected with `InvalidState`.
pub fn cancel(
    state: &AppState,
    booking_id: Uuid,
    reason: Option<String>,
) -> Result<Booking, AppError> {
    let current = state
        .bookings
        .get(booking_id)
        .ok_or(AppError::BookingNotFound(booking_id))?;
    if !matches!(
        current.status,
        BookingStatus::Pending | BookingStatus::Accepted
    ) {
        return Err(AppError::InvalidState(format!(
            "cannot cancel a {} booking",
            current.status
        )));
    }

    let was_pending = current.status == BookingStatus::Pending;
    let booking = transition(
        &state.bookings,
        booking_id,
        current.status,
        BookingStatus::Cancelled,
        |booking| {
            booking.cancel_reason = reason;
            booking.cancelled_at = Some(Utc::now());
        },
    )?;

    state
        .metrics
        .booking_transitions_total
        .with_label_values(&["cancelled"])
        .inc();
    if was_pending {
        state.metrics.pending_bookings.dec();
    }
    state.events.publish(DispatchEvent::BookingUpdated {
        booking: booking.clone(),
    });

    info!(booking_id = %booking.id, "booking cancelled");

    Ok(booking)
}

/// Records the customer's rating for a completed trip. A second call
/// overwrites the first; no status transition takes place.
pub fn rate(
    state: &AppState,
    booking_id: Uuid,
    customer_id: Uuid,
    rating: u8,
    comment: Option<String>,
) -> Result<Booking, AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidRating(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }

    let current = state
        .bookings
        .get(booking_id)
        .ok_or(AppError::BookingNotFound(booking_id))?;
    if current.customer_id != customer_id {
        return Err(AppError::InvalidRating(
            "only the booking's customer may rate the trip".to_string(),
        ));
    }

    // Same-status CAS: keeps the completed check and the write atomic
    // without opening a second mutation path for status.
    let booking = state
        .bookings
        .conditional_transition(
            booking_id,
            BookingStatus::Completed,
            BookingStatus::Completed,
            |booking| {
                booking.rating = Some(rating);
                booking.rating_comment = comment;
            },
        )
        .map_err(|err| match err {
            TransitionError::NotFound => AppError::BookingNotFound(booking_id),
            TransitionError::StatusMismatch(status) => {
                AppError::InvalidRating(format!("cannot rate a {status} booking"))
            }
        })?;

    info!(booking_id = %booking.id, rating, "booking rated");

    Ok(booking)
}

fn transition<F>(
    bookings: &BookingStore,
    booking_id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
    mutate: F,
) -> Result<Booking, AppError>
where
    F: FnOnce(&mut Booking),
{
    bookings
        .conditional_transition(booking_id, from, to, mutate)
        .map_err(|err| match err {
            TransitionError::NotFound => AppError::BookingNotFound(booking_id),
            TransitionError::StatusMismatch(status) => {
                AppError::InvalidState(format!("booking is {status}, expected {from}"))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Role, DEFAULT_DRIVER_RATING};

    fn test_state() -> AppState {
        AppState::new(64, 300)
    }

    fn seed_customer(state: &AppState) -> User {
        let customer = User {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            role: Role::Customer,
            vehicle_type: None,
            vehicle_number: None,
            is_online: false,
            is_approved: true,
            rating: 0.0,
            total_trips: 0,
            total_earnings: 0,
            created_at: Utc::now(),
        };
        state.users.insert(customer.clone());
        customer
    }

    fn seed_driver(state: &AppState, name: &str, vehicle_type: &str) -> User {
        let driver = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: format!("98{}", rand::random::<u32>()),
            role: Role::Driver,
            vehicle_type: Some(vehicle_type.to_string()),
            vehicle_number: Some("MP09 AB 1234".to_string()),
            is_online: true,
            is_approved: true,
            rating: DEFAULT_DRIVER_RATING,
            total_trips: 0,
            total_earnings: 0,
            created_at: Utc::now(),
        };
        state.users.insert(driver.clone());
        driver
    }

    fn place(name: &str, lat: f64, lng: f64) -> Location {
        Location {
            name: name.to_string(),
            area: "Indore".to_string(),
            lat,
            lng,
        }
    }

    fn create_tempo_booking(state: &AppState, customer_id: Uuid) -> Booking {
        create_booking(
            state,
            customer_id,
            place("Warehouse A", 22.72, 75.86),
            place("Shop B", 22.75, 75.90),
            "tempo",
            PaymentMethod::Cash,
        )
        .unwrap()
    }

    #[test]
    fn create_prices_the_indore_tempo_scenario() {
        let state = test_state();
        let customer = seed_customer(&state);

        let booking = create_tempo_booking(&state, customer.id);

        assert_eq!(booking.distance, 5.3);
        assert_eq!(booking.base_price, 150);
        assert_eq!(booking.distance_charge, 95);
        assert_eq!(booking.total_price, 245);
        assert_eq!(booking.estimated_time, 21);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.pickup_code.len(), 4);
        assert_eq!(booking.customer_name, "Asha");
        assert!(booking.driver_id.is_none());
    }

    #[test]
    fn create_rejects_unknown_vehicle_type() {
        let state = test_state();
        let customer = seed_customer(&state);

        let err = create_booking(
            &state,
            customer.id,
            place("A", 22.72, 75.86),
            place("B", 22.75, 75.90),
            "bicycle",
            PaymentMethod::Cash,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidVehicleType(_)));
        assert!(state.bookings.is_empty());
    }

    #[test]
    fn create_rejects_deactivated_vehicle_type() {
        let state = test_state();
        let customer = seed_customer(&state);
        state.pricing.update(
            "tempo",
            crate::store::pricing::PricingUpdate {
                base_fare: None,
                per_km_charge: None,
                is_active: Some(false),
            },
        );

        let err = create_booking(
            &state,
            customer.id,
            place("A", 22.72, 75.86),
            place("B", 22.75, 75.90),
            "tempo",
            PaymentMethod::Cash,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidVehicleType(_)));
    }

    #[test]
    fn concurrent_accepts_have_exactly_one_winner() {
        let state = std::sync::Arc::new(test_state());
        let customer = seed_customer(&state);
        let booking = create_tempo_booking(&state, customer.id);

        let drivers: Vec<User> = (0..8)
            .map(|i| seed_driver(&state, &format!("driver-{i}"), "tempo"))
            .collect();

        let booking_id = booking.id;
        let results: Vec<Result<Booking, AppError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = drivers
                .iter()
                .map(|driver| {
                    let state = state.clone();
                    scope.spawn(move || accept(&state, booking_id, driver))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<&Booking> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::BookingAlreadyTaken)))
            .count();

        assert_eq!(winners.len(), 1);
        assert_eq!(losers, 7);

        let stored = state.bookings.get(booking.id).unwrap();
        assert_eq!(stored.status, BookingStatus::Accepted);
        assert_eq!(stored.driver_id, winners[0].driver_id);
        assert!(stored.accepted_at.is_some());
    }

    #[test]
    fn start_requires_the_issued_code() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");
        let booking = create_tempo_booking(&state, customer.id);
        accept(&state, booking.id, &driver).unwrap();

        let wrong_code = if booking.pickup_code == "1111" {
            "2222"
        } else {
            "1111"
        };
        let err = start(&state, booking.id, wrong_code).unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
        assert_eq!(
            state.bookings.get(booking.id).unwrap().status,
            BookingStatus::Accepted
        );

        let started = start(&state, booking.id, &booking.pickup_code).unwrap();
        assert_eq!(started.status, BookingStatus::InProgress);
        assert!(started.started_at.is_some());

        // the code was consumed and the booking has moved on
        let replay = start(&state, booking.id, &booking.pickup_code).unwrap_err();
        assert!(matches!(replay, AppError::InvalidState(_)));
    }

    #[test]
    fn start_rejects_pending_booking_without_consuming_code() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");
        let booking = create_tempo_booking(&state, customer.id);

        let err = start(&state, booking.id, &booking.pickup_code).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // still usable once the booking is accepted
        accept(&state, booking.id, &driver).unwrap();
        assert!(start(&state, booking.id, &booking.pickup_code).is_ok());
    }

    #[test]
    fn complete_accrues_earnings_exactly_once() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");
        let booking = create_tempo_booking(&state, customer.id);
        accept(&state, booking.id, &driver).unwrap();
        start(&state, booking.id, &booking.pickup_code).unwrap();

        let completed = complete(&state, booking.id, driver.id).unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);

        let updated_driver = state.users.get(driver.id).unwrap();
        assert_eq!(updated_driver.total_trips, 1);
        assert_eq!(updated_driver.total_earnings, 245);

        let err = complete(&state, booking.id, driver.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(state.users.get(driver.id).unwrap().total_trips, 1);
    }

    #[test]
    fn complete_rejects_a_different_driver() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");
        let other = seed_driver(&state, "Sanjay", "tempo");
        let booking = create_tempo_booking(&state, customer.id);
        accept(&state, booking.id, &driver).unwrap();
        start(&state, booking.id, &booking.pickup_code).unwrap();

        let err = complete(&state, booking.id, other.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn cancel_allowed_from_pending_and_accepted_only() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");

        let pending = create_tempo_booking(&state, customer.id);
        let cancelled = cancel(&state, pending.id, Some("changed my mind".to_string())).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("changed my mind"));

        let accepted = create_tempo_booking(&state, customer.id);
        accept(&state, accepted.id, &driver).unwrap();
        assert!(cancel(&state, accepted.id, None).is_ok());

        // already cancelled
        let err = cancel(&state, pending.id, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // in progress
        let running = create_tempo_booking(&state, customer.id);
        accept(&state, running.id, &driver).unwrap();
        start(&state, running.id, &running.pickup_code).unwrap();
        let err = cancel(&state, running.id, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn price_components_survive_the_full_lifecycle() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");
        let booking = create_tempo_booking(&state, customer.id);

        accept(&state, booking.id, &driver).unwrap();
        start(&state, booking.id, &booking.pickup_code).unwrap();
        complete(&state, booking.id, driver.id).unwrap();

        let finished = state.bookings.get(booking.id).unwrap();
        assert_eq!(finished.base_price, booking.base_price);
        assert_eq!(finished.distance_charge, booking.distance_charge);
        assert_eq!(finished.total_price, booking.total_price);
        assert_eq!(finished.pickup_code, booking.pickup_code);
    }

    #[test]
    fn rate_requires_completed_booking_and_valid_range() {
        let state = test_state();
        let customer = seed_customer(&state);
        let driver = seed_driver(&state, "Ravi", "tempo");
        let booking = create_tempo_booking(&state, customer.id);

        let err = rate(&state, booking.id, customer.id, 5, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidRating(_)));

        accept(&state, booking.id, &driver).unwrap();
        start(&state, booking.id, &booking.pickup_code).unwrap();
        complete(&state, booking.id, driver.id).unwrap();

        let err = rate(&state, booking.id, customer.id, 0, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidRating(_)));
        let err = rate(&state, booking.id, customer.id, 6, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidRating(_)));

        let err = rate(&state, booking.id, Uuid::new_v4(), 5, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidRating(_)));

        let rated = rate(
            &state,
            booking.id,
            customer.id,
            4,
            Some("quick delivery".to_string()),
        )
        .unwrap();
        assert_eq!(rated.rating, Some(4));
        assert_eq!(rated.rating_comment.as_deref(), Some("quick delivery"));

        // re-rating overwrites
        let rerated = rate(&state, booking.id, customer.id, 5, None).unwrap();
        assert_eq!(rerated.rating, Some(5));
        assert_eq!(rerated.status, BookingStatus::Completed);
    }
}
