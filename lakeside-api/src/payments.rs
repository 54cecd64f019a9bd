use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use lakeside_booking::{RecordPayment, Requester};
use lakeside_core::Payment;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::staff_only;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let desk = Router::new()
        .route("/v1/payments/{id}/refund", post(refund_payment))
        .route_layer(middleware::from_fn(staff_only));

    Router::new()
        .route("/v1/bookings/{id}/payments", get(list_payments).post(record_payment))
        .merge(desk)
}

async fn list_payments(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(state.payments.list_payments(id).await?))
}

async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(requester): Extension<Requester>,
    Json(req): Json<RecordPayment>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment = state.payments.record_payment(id, req, &requester).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn refund_payment(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Payment>, AppError> {
    Ok(Json(state.payments.refund_payment(id).await?))
}
