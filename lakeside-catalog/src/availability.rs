use chrono::NaiveDate;
use lakeside_core::{HoldPolicy, HotelRepository, Room, RoomType, StoreError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// A free room together with its type.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableRoom {
    pub room: Room,
    pub room_type: RoomType,
}

/// Finds physical rooms with no conflicting booking for a stay
pub struct AvailabilityFinder {
    repo: Arc<dyn HotelRepository>,
    policy: HoldPolicy,
}

impl AvailabilityFinder {
    pub fn new(repo: Arc<dyn HotelRepository>, policy: HoldPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> HoldPolicy {
        self.policy
    }

    /// Rooms free for `[check_in, check_out)`, ordered by floor then number.
    pub async fn find_available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type_id: Option<Uuid>,
    ) -> Result<Vec<AvailableRoom>, StoreError> {
        self.search(check_in, check_out, room_type_id, None).await
    }

    /// Same search, ignoring the line items of one booking (date edits).
    pub async fn find_available_rooms_excluding(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type_id: Option<Uuid>,
        exclude_booking: Uuid,
    ) -> Result<Vec<AvailableRoom>, StoreError> {
        self.search(check_in, check_out, room_type_id, Some(exclude_booking)).await
    }

    /// First of `room_ids` held for `[check_in, check_out)` by a booking
    /// other than `exclude_booking`. Housekeeping status is not consulted.
    pub async fn first_held_room(
        &self,
        room_ids: &[Uuid],
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_booking: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let held: HashSet<Uuid> = self
            .repo
            .list_room_holds(check_in, check_out, self.policy.blocking_statuses())
            .await?
            .into_iter()
            .filter(|hold| hold.booking_id != exclude_booking)
            .map(|hold| hold.room_id)
            .collect();
        Ok(room_ids.iter().copied().find(|id| held.contains(id)))
    }

    async fn search(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type_id: Option<Uuid>,
        exclude_booking: Option<Uuid>,
    ) -> Result<Vec<AvailableRoom>, StoreError> {
        let rooms = self.repo.list_rooms(room_type_id).await?;
        let room_types: HashMap<Uuid, RoomType> = self
            .repo
            .list_room_types()
            .await?
            .into_iter()
            .filter(|t| t.is_active)
            .map(|t| (t.id, t))
            .collect();

        let held: HashSet<Uuid> = self
            .repo
            .list_room_holds(check_in, check_out, self.policy.blocking_statuses())
            .await?
            .into_iter()
            .filter(|hold| Some(hold.booking_id) != exclude_booking)
            .map(|hold| hold.room_id)
            .collect();

        let available: Vec<AvailableRoom> = rooms
            .into_iter()
            .filter(|room| room.is_active && room.status.is_bookable())
            .filter(|room| !held.contains(&room.id))
            .filter_map(|room| {
                room_types
                    .get(&room.room_type_id)
                    .cloned()
                    .map(|room_type| AvailableRoom { room, room_type })
            })
            .collect();

        tracing::debug!(
            %check_in,
            %check_out,
            room_type = ?room_type_id,
            held = held.len(),
            available = available.len(),
            "Availability search"
        );

        Ok(available)
    }
}
