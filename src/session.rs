//! Bearer tokens: issuing on login and verifying on every protected request.
//!
//! Tokens are HS256 JWTs. Verification is stateless and there is no
//! revocation; a token dies at `exp`.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    structs::{Account, Role},
    AppState,
};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Account id within the role's table.
    pub sub: String,
    pub external_id: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub external_id: String,
    pub role: Role,
}

impl Identity {
    /// Role gate for an operation. `action` ends up in the 403 message.
    pub fn require(&self, role: Role, action: &str) -> Result<(), AppError> {
        if self.role == role {
            return Ok(());
        }
        log::warn!(
            "{} {} ({}) refused: only a {} can {}",
            self.role,
            self.id,
            self.external_id,
            role,
            action
        );
        Err(AppError::Forbidden(format!("Only {}s can {}", role, action)))
    }
}

/// A freshly signed token and the instant it stops verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        TokenIssuer {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, account: &Account) -> Result<IssuedToken, AppError> {
        self.issue_at(account, Utc::now())
    }

    /// Signs a token as if issued at `now`.
    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> Result<IssuedToken, AppError> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            log::error!("Token expiry overflows: issued {} with ttl {}", now, self.ttl);
            AppError::InternalServerError
        })?;
        let claims = Claims {
            sub: account.id.to_string(),
            external_id: account.external_id.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            log::error!("Failed to sign token: {}", e);
            AppError::InternalServerError
        })?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            log::debug!("Token rejected: {}", e);
            AppError::InvalidToken
        })?;
        let claims = data.claims;
        let id = claims.sub.parse::<i64>().map_err(|_| AppError::InvalidToken)?;
        Ok(Identity {
            id,
            external_id: claims.external_id,
            role: claims.role,
        })
    }
}

/// The credentials of an `Authorization: Bearer <token>` header.
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            log::error!("AppState is not registered on the app");
            return ready(Err(AppError::InternalServerError));
        };
        let result = match bearer_token(req) {
            None => Err(AppError::MissingToken),
            Some(token) => state.tokens.verify(token).map_err(|e| {
                log::warn!("Rejected bearer token on {}: {}", req.path(), e);
                e
            }),
        };
        ready(result)
    }
}
