use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::repository::StoreError;

/// Short-lived advisory lock on a physical room.
///
/// Held from allocation until the booking commit finishes so two requests
/// cannot both decide on the same room. Locks expire after `ttl` in case the
/// holder dies before releasing.
#[async_trait]
pub trait RoomLock: Send + Sync {
    /// Returns `false` when another owner currently holds the room.
    async fn try_acquire(&self, room_id: Uuid, owner: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Releases the lock only if `owner` still holds it.
    async fn release(&self, room_id: Uuid, owner: &str) -> Result<(), StoreError>;
}
