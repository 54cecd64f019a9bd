use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use lakeside_booking::Requester;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

const STAFF_ROLES: [&str; 2] = ["STAFF", "ADMIN"];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn into_requester(self) -> Requester {
        if STAFF_ROLES.contains(&self.role.as_str()) {
            Requester::Staff { staff_id: self.sub }
        } else {
            Requester::Guest
        }
    }
}

/// No token is a guest. A token that fails to decode is rejected outright.
pub fn requester_from_headers(headers: &HeaderMap, secret: &str) -> Result<Requester, AppError> {
    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        return Ok(Requester::Guest);
    };

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims.into_requester())
}

/// Resolves the caller once per request and stores it as a `Requester` extension.
pub async fn identify_requester(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let requester = requester_from_headers(req.headers(), &state.auth.secret)?;
    req.extensions_mut().insert(requester);
    Ok(next.run(req).await)
}

/// Front-desk routes. Must run inside `identify_requester`.
pub async fn staff_only(req: Request, next: Next) -> Result<Response, AppError> {
    let is_staff = req
        .extensions()
        .get::<Requester>()
        .is_some_and(Requester::is_staff);
    if !is_staff {
        return Err(AppError::AuthorizationError("Staff access required".to_string()));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn bearer(role: &str) -> HeaderMap {
        let claims = Claims {
            sub: "desk-7".to_string(),
            role: role.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        headers
    }

    #[test]
    fn test_missing_header_is_guest() {
        assert_eq!(requester_from_headers(&HeaderMap::new(), SECRET).unwrap(), Requester::Guest);
    }

    #[test]
    fn test_staff_and_admin_roles_map_to_staff() {
        for role in ["STAFF", "ADMIN"] {
            assert_eq!(
                requester_from_headers(&bearer(role), SECRET).unwrap(),
                Requester::Staff { staff_id: "desk-7".to_string() }
            );
        }
        assert_eq!(requester_from_headers(&bearer("GUEST"), SECRET).unwrap(), Requester::Guest);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let err = requester_from_headers(&bearer("STAFF"), "another-secret").unwrap_err();
        assert!(matches!(err, AppError::AuthenticationError(_)));
    }
}
