use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use lakeside_booking::BookingError;
use lakeside_catalog::{AvailableRoom, PriceQuote};
use lakeside_core::{GuestRegion, Occupancy, ValidationRule};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub region: GuestRegion,
    pub occupancy: Occupancy,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/availability", get(find_available_rooms))
        .route("/v1/room-types/{id}/quote", get(quote))
}

async fn find_available_rooms(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailableRoom>>, AppError> {
    if query.check_out <= query.check_in {
        return Err(BookingError::from(ValidationRule::CheckOutNotAfterCheckIn).into());
    }

    let rooms = state
        .finder
        .find_available_rooms(query.check_in, query.check_out, query.room_type_id)
        .await
        .map_err(BookingError::from)?;

    Ok(Json(rooms))
}

async fn quote(
    State(state): State<AppState>,
    Path(room_type_id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<PriceQuote>, AppError> {
    let quote = state
        .pricing
        .quote(room_type_id, query.check_in, query.check_out, query.region, query.occupancy)
        .await
        .map_err(BookingError::from)?;

    Ok(Json(quote))
}
