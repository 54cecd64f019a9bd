use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use lakeside_booking::CallbackAck;
use lakeside_core::GatewayOutcome;
use serde::Deserialize;

use crate::state::AppState;

/// Mobile-money push result, e.g.
/// `{"reference":"ws_CO_123","outcome":"SUCCESS","amount":7000,"receipt":"QK71ABC"}`.
#[derive(Debug, Deserialize)]
pub struct MobileMoneyCallback {
    pub reference: String,
    #[serde(flatten)]
    pub outcome: GatewayOutcome,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/mobile-money", post(handle_mobile_money_callback))
}

/// POST /v1/webhooks/mobile-money
/// Always answers 200; `accepted: false` asks the gateway to redeliver.
async fn handle_mobile_money_callback(State(state): State<AppState>, body: Bytes) -> Json<CallbackAck> {
    let callback: MobileMoneyCallback = match serde_json::from_slice(&body) {
        Ok(callback) => callback,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed mobile money callback");
            return Json(CallbackAck { accepted: true, payment_id: None });
        }
    };

    tracing::info!(reference = %callback.reference, "Received mobile money callback");
    Json(state.payments.apply_gateway_callback(&callback.reference, callback.outcome).await)
}
