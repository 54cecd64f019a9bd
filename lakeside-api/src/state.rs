use lakeside_booking::{BookingManager, PaymentReconciler, PriceChangePlanner};
use lakeside_catalog::{AvailabilityFinder, PricingResolver};
use lakeside_core::events::BookingEventSink;
use lakeside_core::lock::RoomLock;
use lakeside_core::{BookingRules, HotelRepository};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub changes: Arc<PriceChangePlanner>,
    pub payments: Arc<PaymentReconciler>,
    pub finder: Arc<AvailabilityFinder>,
    pub pricing: Arc<PricingResolver>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wires the engine components over one repository.
    pub fn new(
        repo: Arc<dyn HotelRepository>,
        locks: Arc<dyn RoomLock>,
        events: Arc<dyn BookingEventSink>,
        rules: BookingRules,
        auth: AuthConfig,
    ) -> Self {
        let bookings = BookingManager::new(repo.clone(), locks, events.clone(), rules.clone());
        let finder = bookings.finder();
        let pricing = bookings.pricing();
        let changes = PriceChangePlanner::new(repo.clone(), events.clone(), finder.clone(), pricing.clone(), rules.clone());
        let payments = PaymentReconciler::new(repo, events, rules.hold_policy);

        Self {
            bookings: Arc::new(bookings),
            changes: Arc::new(changes),
            payments: Arc::new(payments),
            finder,
            pricing,
            auth,
        }
    }
}
