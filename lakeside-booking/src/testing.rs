//! Fixture hotel shared by the unit tests.

use chrono::{Duration, Utc};
use lakeside_catalog::{RoomSelection, RoomTypeRequest};
use lakeside_core::memory::{InMemoryHotelRepository, InMemoryRoomLock, RecordingEventSink};
use lakeside_core::{BookingRules, GuestInfo, GuestRegion, HoldPolicy, Occupancy, PriceTable, Room, RoomType};
use std::sync::Arc;
use uuid::Uuid;

use crate::changes::PriceChangePlanner;
use crate::manager::{BookingManager, CreateBookingRequest, Requester};
use crate::reconciliation::PaymentReconciler;

pub struct Hotel {
    pub repo: Arc<InMemoryHotelRepository>,
    pub locks: Arc<InMemoryRoomLock>,
    pub events: Arc<RecordingEventSink>,
    pub manager: BookingManager,
    pub planner: PriceChangePlanner,
    pub reconciler: PaymentReconciler,
    /// Two rooms, double domestic 7000.
    pub superior: Uuid,
    /// Three rooms, double domestic 5000.
    pub standard: Uuid,
}

pub fn desk() -> Requester {
    Requester::Staff { staff_id: "desk-1".to_string() }
}

impl Hotel {
    pub async fn new() -> Self {
        Self::with_policy(HoldPolicy::default()).await
    }

    pub async fn with_policy(hold_policy: HoldPolicy) -> Self {
        let repo = Arc::new(InMemoryHotelRepository::new());
        let superior = repo
            .add_room_type(RoomType::new(
                "Superior",
                PriceTable { single_domestic: 5000, double_domestic: 7000, single_international: 60, double_international: 85 },
                2,
            ))
            .await;
        let standard = repo
            .add_room_type(RoomType::new(
                "Standard",
                PriceTable { single_domestic: 3500, double_domestic: 5000, single_international: 45, double_international: 60 },
                2,
            ))
            .await;
        for number in ["201", "202"] {
            repo.add_room(Room::new(number, 2, superior)).await;
        }
        for number in ["101", "102", "103"] {
            repo.add_room(Room::new(number, 1, standard)).await;
        }

        let locks = Arc::new(InMemoryRoomLock::new());
        let events = Arc::new(RecordingEventSink::new());
        let rules = BookingRules { hold_policy, ..BookingRules::default() };
        let manager = BookingManager::new(repo.clone(), locks.clone(), events.clone(), rules.clone());
        let planner = PriceChangePlanner::new(repo.clone(), events.clone(), manager.finder(), manager.pricing(), rules.clone());
        let reconciler = PaymentReconciler::new(repo.clone(), events.clone(), rules.hold_policy);

        Self { repo, locks, events, manager, planner, reconciler, superior, standard }
    }

    /// Domestic double request starting `offset_days` from today.
    pub fn request(&self, room_type_id: Uuid, quantity: u32, offset_days: i64, nights: i64) -> CreateBookingRequest {
        let check_in = Utc::now().date_naive() + Duration::days(offset_days);
        CreateBookingRequest {
            guest: GuestInfo {
                full_name: "Wanjiru Kamau".to_string(),
                email: "wanjiru@example.com".to_string().into(),
                phone: "+254700000001".to_string().into(),
                region: GuestRegion::Domestic,
                nationality: None,
                special_requests: None,
            },
            check_in,
            check_out: check_in + Duration::days(nights),
            adults: 2,
            children: 0,
            occupancy: Occupancy::Double,
            selection: RoomSelection::ByType(vec![RoomTypeRequest { room_type_id, quantity }]),
            initial_payment: None,
            payment_method: None,
            payment_reference: None,
            staff_confirm: false,
        }
    }
}
