use async_trait::async_trait;
use lakeside_core::lock::RoomLock;
use lakeside_core::StoreError;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Room locks as `room-lock:{room_id}` keys holding the owner token.
#[derive(Clone)]
pub struct RedisRoomLock {
    client: redis::Client,
}

impl RedisRoomLock {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    fn key(room_id: Uuid) -> String {
        format!("room-lock:{}", room_id)
    }
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(format!("redis: {}", e))
}

#[async_trait]
impl RoomLock for RedisRoomLock {
    async fn try_acquire(&self, room_id: Uuid, owner: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;

        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(Self::key(room_id))
            .arg(owner)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        debug!(%room_id, owner, acquired = result.is_some(), "Room lock attempt");
        Ok(result.is_some())
    }

    async fn release(&self, room_id: Uuid, owner: &str) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;
        // Delete only our own lock; an expired one may have been taken over.
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let _: i64 = script
            .key(Self::key(room_id))
            .arg(owner)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
