use chrono::Duration;

use crate::events::EventBus;
use crate::observability::metrics::Metrics;
use crate::store::bookings::BookingStore;
use crate::store::otp::OneTimeCodeStore;
use crate::store::pricing::PricingTable;
use crate::store::users::UserStore;

pub struct AppState {
    pub users: UserStore,
    pub bookings: BookingStore,
    pub pricing: PricingTable,
    /// Login codes, keyed by phone number. 5-minute TTL.
    pub login_codes: OneTimeCodeStore,
    /// Pickup codes, keyed by booking id. Live as long as the booking does.
    pub pickup_codes: OneTimeCodeStore,
    pub events: EventBus,
    pub metrics: Metrics,
    pub login_code_ttl: Duration,
}

impl AppState {
    pub fn new(event_buffer_size: usize, login_code_ttl_secs: u64) -> Self {
        Self {
            users: UserStore::new(),
            bookings: BookingStore::new(),
            pricing: PricingTable::with_defaults(),
            login_codes: OneTimeCodeStore::new(),
            pickup_codes: OneTimeCodeStore::new(),
            events: EventBus::new(event_buffer_size),
            metrics: Metrics::new(),
            login_code_ttl: Duration::seconds(login_code_ttl_secs as i64),
        }
    }
}
