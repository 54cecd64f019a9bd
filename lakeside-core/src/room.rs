use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Guest classification driving the price column and the currency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestRegion {
    Domestic,
    International,
}

/// Bed usage; the other axis of the price table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occupancy {
    Single,
    Double,
}

impl GuestRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestRegion::Domestic => "DOMESTIC",
            GuestRegion::International => "INTERNATIONAL",
        }
    }
}

impl Occupancy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occupancy::Single => "SINGLE",
            Occupancy::Double => "DOUBLE",
        }
    }
}

impl FromStr for GuestRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOMESTIC" => Ok(GuestRegion::Domestic),
            "INTERNATIONAL" => Ok(GuestRegion::International),
            other => Err(format!("unknown guest region: {}", other)),
        }
    }
}

impl FromStr for Occupancy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(Occupancy::Single),
            "DOUBLE" => Ok(Occupancy::Double),
            other => Err(format!("unknown occupancy: {}", other)),
        }
    }
}

/// Nightly base prices: {single, double} x {domestic, international}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceTable {
    pub single_domestic: i64,
    pub double_domestic: i64,
    pub single_international: i64,
    pub double_international: i64,
}

impl PriceTable {
    pub fn price_for(&self, region: GuestRegion, occupancy: Occupancy) -> i64 {
        match (region, occupancy) {
            (GuestRegion::Domestic, Occupancy::Single) => self.single_domestic,
            (GuestRegion::Domestic, Occupancy::Double) => self.double_domestic,
            (GuestRegion::International, Occupancy::Single) => self.single_international,
            (GuestRegion::International, Occupancy::Double) => self.double_international,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub prices: PriceTable,
    pub max_occupancy: u32,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl RoomType {
    pub fn new(name: impl Into<String>, prices: PriceTable, max_occupancy: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            prices,
            max_occupancy,
            amenities: Vec::new(),
            images: Vec::new(),
            is_active: true,
        }
    }
}

/// Operational room flag. Independent of date overlap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Reserved,
    Occupied,
    Cleaning,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "AVAILABLE",
            RoomStatus::Reserved => "RESERVED",
            RoomStatus::Occupied => "OCCUPIED",
            RoomStatus::Cleaning => "CLEANING",
            RoomStatus::Maintenance => "MAINTENANCE",
        }
    }

    /// Whether a room in this state may be offered for a new stay at all.
    pub fn is_bookable(&self) -> bool {
        matches!(self, RoomStatus::Available | RoomStatus::Reserved)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(RoomStatus::Available),
            "RESERVED" => Ok(RoomStatus::Reserved),
            "OCCUPIED" => Ok(RoomStatus::Occupied),
            "CLEANING" => Ok(RoomStatus::Cleaning),
            "MAINTENANCE" => Ok(RoomStatus::Maintenance),
            other => Err(format!("unknown room status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub floor: i32,
    pub room_type_id: Uuid,
    pub status: RoomStatus,
    pub is_active: bool,
}

impl Room {
    pub fn new(room_number: impl Into<String>, floor: i32, room_type_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_number: room_number.into(),
            floor,
            room_type_id,
            status: RoomStatus::Available,
            is_active: true,
        }
    }
}

/// Date-bound override of a room type's base price.
///
/// `start_date..=end_date` is inclusive. A fixed price, when present, replaces
/// the nightly price; otherwise the multiplier (default 1.0) scales it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPricing {
    pub id: Uuid,
    pub room_type_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fixed_price: Option<i64>,
    pub multiplier: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SeasonalPricing {
    pub fn with_multiplier(
        room_type_id: Uuid,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        multiplier: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_type_id,
            name: name.into(),
            start_date,
            end_date,
            fixed_price: None,
            multiplier: Some(multiplier),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_fixed_price(
        room_type_id: Uuid,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        fixed_price: i64,
    ) -> Self {
        Self {
            fixed_price: Some(fixed_price),
            multiplier: None,
            ..Self::with_multiplier(room_type_id, name, start_date, end_date, 1.0)
        }
    }

    pub fn effective_multiplier(&self) -> f64 {
        self.multiplier.unwrap_or(1.0)
    }

    /// Inclusive season range against a half-open stay.
    pub fn intersects(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.start_date < check_out && self.end_date >= check_in
    }
}
