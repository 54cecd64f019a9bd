use lakeside_core::{BookingRules, HoldPolicy};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Layers rows of `booking_settings` over the configured rules.
    pub async fn fetch_booking_rules(&self, defaults: BookingRules) -> Result<BookingRules, sqlx::Error> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT setting_key, setting_value FROM booking_settings")
                .fetch_all(&self.pool)
                .await?;

        let mut rules = defaults;
        for (key, value) in rows {
            // Expected format: {"value": <number/string>}
            match value.get("value") {
                Some(v) => apply_setting(&mut rules, &key, v),
                None => warn!(setting = %key, "Booking setting without a value field, ignoring"),
            }
        }

        Ok(rules)
    }
}

fn apply_setting(rules: &mut BookingRules, key: &str, v: &Value) {
    match key {
        "number_prefix" => {
            if let Some(s) = v.as_str() {
                rules.number_prefix = s.to_string();
            }
        }
        "max_stay_nights" => {
            if let Some(n) = v.as_i64() {
                rules.max_stay_nights = n;
            }
        }
        "hold_policy" => match serde_json::from_value::<HoldPolicy>(v.clone()) {
            Ok(policy) => rules.hold_policy = policy,
            Err(e) => warn!(error = %e, "Unknown hold policy in booking settings"),
        },
        "lock_ttl_seconds" => {
            if let Some(n) = v.as_u64() {
                rules.lock_ttl_seconds = n;
            }
        }
        _ => warn!(setting = %key, "Unknown booking setting"),
    }
}
