use serde::Deserialize;
use std::time::Duration;

use crate::booking::HoldPolicy;

/// Tunable booking behaviour, read from the `booking` config section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BookingRules {
    pub number_prefix: String,
    pub max_stay_nights: i64,
    pub hold_policy: HoldPolicy,
    pub lock_ttl_seconds: u64,
    pub domestic_currency: String,
    pub international_currency: String,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            number_prefix: "BK".to_string(),
            max_stay_nights: 30,
            hold_policy: HoldPolicy::IncludePending,
            lock_ttl_seconds: 30,
            domestic_currency: "KES".to_string(),
            international_currency: "USD".to_string(),
        }
    }
}

impl BookingRules {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds)
    }
}
