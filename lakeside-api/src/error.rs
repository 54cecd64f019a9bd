use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lakeside_booking::BookingError;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, Value) {
        let message = self.to_string();
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, json!({ "error": message })),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            AppError::Booking(err) => booking_error(err, message),
        }
    }
}

fn booking_error(err: &BookingError, message: String) -> (StatusCode, Value) {
    match err {
        BookingError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message })),
        BookingError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            json!({ "error": message, "entity": entity, "id": id }),
        ),
        BookingError::InsufficientAvailability { room_type_id, available, requested } => (
            StatusCode::CONFLICT,
            json!({
                "error": message,
                "room_type_id": room_type_id,
                "available": available,
                "requested": requested,
            }),
        ),
        BookingError::RoomUnavailable { room_id } => {
            (StatusCode::CONFLICT, json!({ "error": message, "room_id": room_id }))
        }
        BookingError::Overpayment { remaining, attempted } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "remaining": remaining, "attempted": attempted }),
        ),
        BookingError::Conflict { room_id } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "retryable": true, "room_id": room_id }),
        ),
        BookingError::InvalidTransition(t) => (
            StatusCode::CONFLICT,
            json!({ "error": message, "from": t.from, "event": t.event }),
        ),
        BookingError::StaffOnly(_) => (StatusCode::FORBIDDEN, json!({ "error": message })),
        BookingError::PriceChangeNotAccepted { difference } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "difference": difference }),
        ),
        BookingError::Infrastructure(detail) => {
            tracing::error!("Internal Server Error: {}", detail);
            (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeside_core::ValidationRule;
    use uuid::Uuid;

    #[test]
    fn test_conflict_is_marked_retryable() {
        let room_id = Uuid::new_v4();
        let (status, body) = AppError::from(BookingError::Conflict { room_id: Some(room_id) }).status_and_body();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["retryable"], true);
        assert_eq!(body["room_id"], room_id.to_string());
    }

    #[test]
    fn test_overpayment_reports_remaining_balance() {
        let (status, body) =
            AppError::from(BookingError::Overpayment { remaining: 4000, attempted: 5000 }).status_and_body();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["remaining"], 4000);
    }

    #[test]
    fn test_infrastructure_detail_is_not_leaked() {
        let (status, body) =
            AppError::from(BookingError::Infrastructure("connection refused".into())).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal Server Error" }));
    }

    #[test]
    fn test_staff_only_is_forbidden() {
        let (status, body) =
            AppError::from(BookingError::StaffOnly("record a manual payment")).status_and_body();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Only staff may record a manual payment");
    }

    #[test]
    fn test_validation_names_the_rule() {
        let (status, body) =
            AppError::from(BookingError::Validation(ValidationRule::InvalidGuestCount)).status_and_body();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("at least one adult"));
    }
}
