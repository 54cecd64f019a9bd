use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use lakeside_booking::{BookingChange, CreateBookingRequest, PriceChangePreview, Requester};
use lakeside_core::{Booking, RoomStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::staff_only;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApplyChangeRequest {
    #[serde(flatten)]
    pub change: BookingChange,
    #[serde(default)]
    pub accept_difference: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoomStatusRequest {
    pub status: RoomStatus,
}

pub fn routes() -> Router<AppState> {
    let desk = Router::new()
        .route("/v1/bookings/{id}/check-in", post(check_in))
        .route("/v1/bookings/{id}/check-out", post(check_out))
        .route("/v1/bookings/{id}/no-show", post(no_show))
        .route("/v1/rooms/{id}/status", put(set_room_status))
        .route_layer(middleware::from_fn(staff_only));

    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/by-number/{number}", get(find_by_number))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/price-change/preview", post(preview_price_change))
        .route("/v1/bookings/{id}/price-change/apply", post(apply_price_change))
        .merge(desk)
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(req, &requester).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn get_booking(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking(id).await?))
}

async fn find_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.find_by_number(&number).await?))
}

async fn cancel_booking(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel_booking(id).await?))
}

async fn check_in(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.check_in_booking(id).await?))
}

async fn check_out(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.check_out_booking(id).await?))
}

async fn no_show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.mark_no_show(id).await?))
}

async fn preview_price_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(change): Json<BookingChange>,
) -> Result<Json<PriceChangePreview>, AppError> {
    Ok(Json(state.changes.preview_price_change(id, &change).await?))
}

async fn apply_price_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyChangeRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .changes
        .apply_price_change(id, &req.change, req.accept_difference)
        .await?;
    Ok(Json(booking))
}

async fn set_room_status(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(req): Json<RoomStatusRequest>,
) -> Result<Json<Value>, AppError> {
    state.bookings.set_room_status(room_id, req.status).await?;
    Ok(Json(json!({ "room_id": room_id, "status": req.status })))
}
