use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub booking_transitions_total: IntCounterVec,
    pub pending_bookings: IntGauge,
    pub accept_attempts_total: IntCounterVec,
    pub completed_revenue_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let booking_transitions_total = IntCounterVec::new(
            Opts::new(
                "booking_transitions_total",
                "Booking state transitions by resulting status",
            ),
            &["status"],
        )
        .expect("valid booking_transitions_total metric");

        let pending_bookings = IntGauge::new(
            "pending_bookings",
            "Bookings currently waiting for a driver",
        )
        .expect("valid pending_bookings metric");

        let accept_attempts_total = IntCounterVec::new(
            Opts::new("accept_attempts_total", "Accept attempts by outcome"),
            &["outcome"],
        )
        .expect("valid accept_attempts_total metric");

        let completed_revenue_total = IntCounter::new(
            "completed_revenue_total",
            "Sum of total_price over completed bookings",
        )
        .expect("valid completed_revenue_total metric");

        registry
            .register(Box::new(booking_transitions_total.clone()))
            .expect("register booking_transitions_total");
        registry
            .register(Box::new(pending_bookings.clone()))
            .expect("register pending_bookings");
        registry
            .register(Box::new(accept_attempts_total.clone()))
            .expect("register accept_attempts_total");
        registry
            .register(Box::new(completed_revenue_total.clone()))
            .expect("register completed_revenue_total");

        Self {
            registry,
            booking_transitions_total,
            pending_bookings,
            accept_attempts_total,
            completed_revenue_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
