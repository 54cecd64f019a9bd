use chrono::NaiveDate;
use lakeside_core::{BookingRules, GuestRegion, HotelRepository, Occupancy, RoomType, SeasonalPricing, StoreError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// Currency per guest region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencySettings {
    pub domestic: String,
    pub international: String,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            domestic: "KES".to_string(),
            international: "USD".to_string(),
        }
    }
}

impl From<&BookingRules> for CurrencySettings {
    fn from(rules: &BookingRules) -> Self {
        Self {
            domestic: rules.domestic_currency.clone(),
            international: rules.international_currency.clone(),
        }
    }
}

impl CurrencySettings {
    pub fn for_region(&self, region: GuestRegion) -> &str {
        match region {
            GuestRegion::Domestic => &self.domestic,
            GuestRegion::International => &self.international,
        }
    }
}

/// Result of pricing one room of a type for a stay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub room_type_id: Uuid,
    pub region: GuestRegion,
    pub occupancy: Occupancy,
    pub base_price_per_night: i64,
    pub price_per_night: i64,
    pub nights: i64,
    pub total_price: i64,
    pub currency: String,
    /// Seasonal entry that set the nightly price, if any.
    pub seasonal_pricing_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Room type not found: {0}")]
    RoomTypeNotFound(Uuid),

    #[error("Stay must be at least one night, got {nights}")]
    InvalidStay { nights: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, PricingError> {
    let nights = (check_out - check_in).num_days();
    if nights <= 0 {
        return Err(PricingError::InvalidStay { nights });
    }
    Ok(nights)
}

/// Order seasonal entries by precedence; the greatest wins.
///
/// Highest multiplier first, then the later start date, then the most
/// recently created entry, then the id so the choice is total.
fn precedence(a: &SeasonalPricing, b: &SeasonalPricing) -> Ordering {
    a.effective_multiplier()
        .partial_cmp(&b.effective_multiplier())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.start_date.cmp(&b.start_date))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Pick the seasonal entry that applies to a stay, if any.
pub fn select_seasonal_entry(
    entries: &[SeasonalPricing],
    room_type_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Option<&SeasonalPricing> {
    entries
        .iter()
        .filter(|s| s.is_active && s.room_type_id == room_type_id && s.intersects(check_in, check_out))
        .max_by(|a, b| precedence(a, b))
}

/// Nightly price after a seasonal entry. A fixed price replaces the base.
pub fn apply_seasonal(base_price: i64, entry: &SeasonalPricing) -> i64 {
    match entry.fixed_price {
        Some(fixed) => fixed,
        None => (base_price as f64 * entry.effective_multiplier()).round() as i64,
    }
}

/// Price a stay from already-loaded data. Shared by quotes, bookings and
/// price-change previews so they can never disagree.
pub fn price_stay(
    room_type: &RoomType,
    seasonal: &[SeasonalPricing],
    check_in: NaiveDate,
    check_out: NaiveDate,
    region: GuestRegion,
    occupancy: Occupancy,
    currencies: &CurrencySettings,
) -> Result<PriceQuote, PricingError> {
    let nights = nights_between(check_in, check_out)?;
    let base_price_per_night = room_type.prices.price_for(region, occupancy);

    let entry = select_seasonal_entry(seasonal, room_type.id, check_in, check_out);
    let price_per_night = entry
        .map(|s| apply_seasonal(base_price_per_night, s))
        .unwrap_or(base_price_per_night);

    Ok(PriceQuote {
        room_type_id: room_type.id,
        region,
        occupancy,
        base_price_per_night,
        price_per_night,
        nights,
        total_price: price_per_night * nights,
        currency: currencies.for_region(region).to_string(),
        seasonal_pricing_id: entry.map(|s| s.id),
    })
}

/// Resolves nightly prices against the repository
pub struct PricingResolver {
    repo: Arc<dyn HotelRepository>,
    currencies: CurrencySettings,
}

impl PricingResolver {
    pub fn new(repo: Arc<dyn HotelRepository>, currencies: CurrencySettings) -> Self {
        Self { repo, currencies }
    }

    pub fn currencies(&self) -> &CurrencySettings {
        &self.currencies
    }

    pub async fn quote(
        &self,
        room_type_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        region: GuestRegion,
        occupancy: Occupancy,
    ) -> Result<PriceQuote, PricingError> {
        nights_between(check_in, check_out)?;

        let room_type = self
            .repo
            .get_room_type(room_type_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or(PricingError::RoomTypeNotFound(room_type_id))?;

        let seasonal = self
            .repo
            .list_seasonal_pricing(room_type_id, check_in, check_out)
            .await?;

        let quote = price_stay(&room_type, &seasonal, check_in, check_out, region, occupancy, &self.currencies)?;
        tracing::debug!(
            room_type = %room_type.name,
            price_per_night = quote.price_per_night,
            nights = quote.nights,
            seasonal = ?quote.seasonal_pricing_id,
            "Priced stay"
        );
        Ok(quote)
    }
}
