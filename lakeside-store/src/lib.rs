pub mod app_config;
pub mod database;
pub mod hotel_repo;
pub mod redis_repo;
pub mod events;

pub use app_config::Config;
pub use database::DbClient;
pub use events::EventProducer;
pub use hotel_repo::PostgresHotelRepository;
pub use redis_repo::RedisRoomLock;
