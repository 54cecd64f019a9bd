use chrono::NaiveDate;
use lakeside_core::{StoreError, ValidationRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::availability::{AvailabilityFinder, AvailableRoom};

/// Rooms wanted of one type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomTypeRequest {
    pub room_type_id: Uuid,
    pub quantity: u32,
}

/// How a reservation names its rooms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "rooms", rename_all = "snake_case")]
pub enum RoomSelection {
    ByType(Vec<RoomTypeRequest>),
    Explicit(Vec<Uuid>),
}

#[derive(Debug, Clone)]
pub struct Allocation {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<AvailableRoom>,
}

impl Allocation {
    /// Ids in the order locks must be taken.
    pub fn sorted_room_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.rooms.iter().map(|r| r.room.id).collect();
        ids.sort();
        ids
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Not enough rooms of type {room_type_id}: {available} available, {requested} requested")]
    InsufficientAvailability {
        room_type_id: Uuid,
        available: usize,
        requested: usize,
    },

    #[error("Room {room_id} is not available for the requested dates")]
    RoomUnavailable { room_id: Uuid },

    #[error("Invalid selection: {0}")]
    Validation(ValidationRule),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Picks concrete rooms for a reservation request. Reads only.
pub struct RoomAllocator {
    finder: Arc<AvailabilityFinder>,
}

impl RoomAllocator {
    pub fn new(finder: Arc<AvailabilityFinder>) -> Self {
        Self { finder }
    }

    pub async fn allocate(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        selection: &RoomSelection,
    ) -> Result<Allocation, AllocationError> {
        let rooms = match selection {
            RoomSelection::ByType(requests) => self.allocate_by_type(check_in, check_out, requests).await?,
            RoomSelection::Explicit(room_ids) => self.allocate_explicit(check_in, check_out, room_ids).await?,
        };

        tracing::debug!(
            %check_in,
            %check_out,
            rooms = ?rooms.iter().map(|r| r.room.room_number.as_str()).collect::<Vec<_>>(),
            "Allocated rooms"
        );

        Ok(Allocation { check_in, check_out, rooms })
    }

    async fn allocate_by_type(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        requests: &[RoomTypeRequest],
    ) -> Result<Vec<AvailableRoom>, AllocationError> {
        // Merge repeated types, keeping first-seen order.
        let mut merged: Vec<(Uuid, usize)> = Vec::new();
        for request in requests {
            if request.quantity == 0 {
                return Err(AllocationError::Validation(ValidationRule::ZeroQuantity(request.room_type_id)));
            }
            match merged.iter_mut().find(|(id, _)| *id == request.room_type_id) {
                Some((_, quantity)) => *quantity += request.quantity as usize,
                None => merged.push((request.room_type_id, request.quantity as usize)),
            }
        }
        if merged.is_empty() {
            return Err(AllocationError::Validation(ValidationRule::EmptySelection));
        }

        let mut allocated = Vec::new();
        for (room_type_id, requested) in merged {
            let free = self
                .finder
                .find_available_rooms(check_in, check_out, Some(room_type_id))
                .await?;
            if free.len() < requested {
                return Err(AllocationError::InsufficientAvailability {
                    room_type_id,
                    available: free.len(),
                    requested,
                });
            }
            allocated.extend(free.into_iter().take(requested));
        }
        Ok(allocated)
    }

    async fn allocate_explicit(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_ids: &[Uuid],
    ) -> Result<Vec<AvailableRoom>, AllocationError> {
        if room_ids.is_empty() {
            return Err(AllocationError::Validation(ValidationRule::EmptySelection));
        }
        let mut seen = HashSet::new();
        for id in room_ids {
            if !seen.insert(*id) {
                return Err(AllocationError::Validation(ValidationRule::DuplicateRoom(*id)));
            }
        }

        let mut free = self.finder.find_available_rooms(check_in, check_out, None).await?;
        let mut allocated = Vec::with_capacity(room_ids.len());
        for room_id in room_ids {
            let position = free
                .iter()
                .position(|r| r.room.id == *room_id)
                .ok_or(AllocationError::RoomUnavailable { room_id: *room_id })?;
            allocated.push(free.swap_remove(position));
        }
        Ok(allocated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeside_core::memory::InMemoryHotelRepository;
    use lakeside_core::{HoldPolicy, HotelRepository, PriceTable, Room, RoomStatus, RoomType};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    async fn hotel() -> (Arc<InMemoryHotelRepository>, Uuid, Uuid) {
        let repo = Arc::new(InMemoryHotelRepository::new());
        let prices = PriceTable { single_domestic: 5000, double_domestic: 7000, single_international: 60, double_international: 85 };
        let standard = repo.add_room_type(RoomType::new("Standard", prices, 2)).await;
        let suite = repo.add_room_type(RoomType::new("Suite", prices, 4)).await;
        repo.add_room(Room::new("102", 1, standard)).await;
        repo.add_room(Room::new("101", 1, standard)).await;
        repo.add_room(Room::new("301", 3, suite)).await;
        (repo, standard, suite)
    }

    fn allocator(repo: Arc<InMemoryHotelRepository>) -> RoomAllocator {
        RoomAllocator::new(Arc::new(AvailabilityFinder::new(repo, HoldPolicy::IncludePending)))
    }

    #[tokio::test]
    async fn test_by_type_takes_first_rooms_in_order() {
        let (repo, standard, suite) = hotel().await;
        let selection = RoomSelection::ByType(vec![
            RoomTypeRequest { room_type_id: standard, quantity: 1 },
            RoomTypeRequest { room_type_id: suite, quantity: 1 },
        ]);

        let allocation = allocator(repo).allocate(date(20), date(22), &selection).await.unwrap();
        let numbers: Vec<&str> = allocation.rooms.iter().map(|r| r.room.room_number.as_str()).collect();
        assert_eq!(numbers, vec!["101", "301"]);
    }

    #[tokio::test]
    async fn test_shortage_reports_counts() {
        let (repo, standard, _) = hotel().await;
        let selection = RoomSelection::ByType(vec![RoomTypeRequest { room_type_id: standard, quantity: 3 }]);

        let err = allocator(repo).allocate(date(20), date(22), &selection).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InsufficientAvailability { available: 2, requested: 3, .. }
        ));
        assert!(err.to_string().ends_with("2 available, 3 requested"));
    }

    #[tokio::test]
    async fn test_repeated_types_are_merged() {
        let (repo, standard, _) = hotel().await;
        let selection = RoomSelection::ByType(vec![
            RoomTypeRequest { room_type_id: standard, quantity: 2 },
            RoomTypeRequest { room_type_id: standard, quantity: 1 },
        ]);

        let err = allocator(repo).allocate(date(20), date(22), &selection).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InsufficientAvailability { available: 2, requested: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_selection_validation() {
        let (repo, standard, _) = hotel().await;
        let allocator = allocator(repo);

        let empty = allocator.allocate(date(20), date(22), &RoomSelection::ByType(vec![])).await;
        assert!(matches!(empty, Err(AllocationError::Validation(ValidationRule::EmptySelection))));

        let zero = RoomSelection::ByType(vec![RoomTypeRequest { room_type_id: standard, quantity: 0 }]);
        assert!(matches!(
            allocator.allocate(date(20), date(22), &zero).await,
            Err(AllocationError::Validation(ValidationRule::ZeroQuantity(_)))
        ));

        let room = Uuid::new_v4();
        let dup = RoomSelection::Explicit(vec![room, room]);
        assert!(matches!(
            allocator.allocate(date(20), date(22), &dup).await,
            Err(AllocationError::Validation(ValidationRule::DuplicateRoom(id))) if id == room
        ));
    }

    #[tokio::test]
    async fn test_explicit_rooms_must_be_free() {
        let (repo, standard, _) = hotel().await;
        let mut closed = Room::new("103", 1, standard);
        closed.status = RoomStatus::Maintenance;
        let closed_id = repo.add_room(closed).await;
        let rooms = repo.list_rooms(Some(standard)).await.unwrap();
        let open_id = rooms[0].id;

        let allocator = allocator(repo);
        let allocation = allocator
            .allocate(date(20), date(21), &RoomSelection::Explicit(vec![open_id]))
            .await
            .unwrap();
        assert_eq!(allocation.rooms[0].room.id, open_id);
        assert_eq!(allocation.sorted_room_ids(), vec![open_id]);

        let err = allocator
            .allocate(date(20), date(21), &RoomSelection::Explicit(vec![open_id, closed_id]))
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::RoomUnavailable { room_id } if room_id == closed_id));
    }
}
