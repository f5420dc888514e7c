use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::user::Role;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

fn bearer_token(req: &Request) -> Result<&str, Error> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("missing_authorization".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| Error::Unauthorized("bad_authorization".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("unsupported_scheme".to_string()))
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| Error::Unauthorized("invalid_token".to_string()))
}

/// Only checks the token; sessions are issued elsewhere.
pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = match bearer_token(&req).and_then(|t| decode_claims(t, &state.config.jwt_secret)) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let is_admin = claims
        .role
        .as_deref()
        .is_some_and(|role| role.eq_ignore_ascii_case(Role::Admin.as_str()));
    if !is_admin {
        tracing::warn!(sub = %claims.sub, role = ?claims.role, "non-admin token rejected");
        return Error::Forbidden("forbidden".to_string()).into_response();
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}
