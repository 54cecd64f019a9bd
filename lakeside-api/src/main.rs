use anyhow::Context;
use lakeside_api::{app, AppState, AuthConfig};
use lakeside_core::events::{BookingEventSink, LoggingEventSink};
use lakeside_core::lock::RoomLock;
use lakeside_core::memory::{InMemoryHotelRepository, InMemoryRoomLock};
use lakeside_core::HotelRepository;
use lakeside_store::{Config, DbClient, EventProducer, PostgresHotelRepository, RedisRoomLock};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lakeside_api=debug,lakeside_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Lakeside API on port {}", config.server.port);

    let mut rules = config.booking.clone();
    let repo: Arc<dyn HotelRepository> = match &config.database {
        Some(database) => {
            let db = DbClient::new(&database.url, database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            rules = db
                .fetch_booking_rules(rules)
                .await
                .context("Failed to load booking settings")?;
            let repo = PostgresHotelRepository::new(db.pool.clone());
            let refreshed = repo
                .apply_hold_policy(rules.hold_policy)
                .await
                .context("Stored bookings overlap under the configured hold policy")?;
            if refreshed > 0 {
                tracing::info!(rows = refreshed, hold_policy = ?rules.hold_policy, "Room hold flags recomputed");
            }
            Arc::new(repo)
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            Arc::new(InMemoryHotelRepository::new())
        }
    };

    let locks: Arc<dyn RoomLock> = match &config.redis {
        Some(redis) => Arc::new(RedisRoomLock::new(&redis.url).context("Invalid Redis URL")?),
        None => {
            tracing::warn!("No Redis configured, room locks are local to this process");
            Arc::new(InMemoryRoomLock::new())
        }
    };

    let events: Arc<dyn BookingEventSink> = match &config.kafka {
        Some(kafka) => Arc::new(EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?),
        None => Arc::new(LoggingEventSink),
    };

    tracing::info!(hold_policy = ?rules.hold_policy, prefix = %rules.number_prefix, "Booking rules loaded");

    let state = AppState::new(
        repo,
        locks,
        events,
        rules,
        AuthConfig { secret: config.auth.jwt_secret.clone() },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
