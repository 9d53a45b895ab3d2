//! Token construction and verification (HS256, compact three-segment form).
//! Issue and verify are pure functions of their inputs and the immutable
//! process key; nothing here touches storage.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecretKey;
use crate::identity::role::Role;
use crate::roster::MemberId;

/// Issuer written into every token.
pub const ISSUER: &str = "rollcall";

/// Default token lifespan in days.
pub const DEFAULT_TOKEN_LIFESPAN_DAYS: i64 = 60;

/// Claims carried by a rollcall token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the principal id.
    pub sub: i64,
    /// Private role claim, see [`Role::claim_value`].
    pub typ: u8,
    /// Issuer, always [`ISSUER`].
    pub iss: String,
    /// Expiration time (Unix timestamp).
    pub exp: usize,
}

/// Internal verification taxonomy. Stays distinguishable for logging; the
/// authenticator collapses it before anything reaches a caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is structurally invalid")]
    Malformed,
    #[error("token signature check failed")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token role mismatch: expected {expected}, found {found}")]
    RoleMismatch { expected: Role, found: Role },
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies tokens under the process secret key.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifespan: chrono::Duration,
}

impl TokenCodec {
    pub fn new(key: &SecretKey, lifespan_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
            lifespan: chrono::Duration::days(lifespan_days),
        }
    }

    /// Issue a signed token for the given subject and role, expiring one
    /// lifespan from now.
    pub fn issue(&self, subject: MemberId, role: Role) -> Result<String, TokenError> {
        let exp = chrono::Utc::now() + self.lifespan;
        let claims = Claims {
            sub: subject.0,
            typ: role.claim_value(),
            iss: ISSUER.to_string(),
            exp: exp.timestamp() as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify structure, signature, expiry and role claim, in that order, and
    /// return the subject id. Group membership is never read from a token.
    pub fn verify(&self, token: &str, expected_role: Role) -> Result<MemberId, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0; // expiry is a hard edge
        validation.validate_exp = true;
        validation.validate_nbf = false;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;

        let found = Role::from_claim(data.claims.typ).ok_or(TokenError::Malformed)?;
        if found != expected_role {
            return Err(TokenError::RoleMismatch { expected: expected_role, found });
        }
        Ok(MemberId(data.claims.sub))
    }
}
