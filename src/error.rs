//! Unified API error model and HTTP mapping.
//! This module provides the error enum returned by every HTTP handler, along
//! with the status mapping and the uniform denial body for rejected requests.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Display, Formatter};
use tracing::error;

use crate::identity::AuthError;
use crate::roster::validate::ValidationError;
use crate::roster::{RosterError, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiError {
    MalformedRequest { code: String, message: String },
    AccessDenied { code: String, message: String },
    NotFound { code: String, message: String },
    StoreUnavailable { code: String, message: String },
    Internal { code: String, message: String },
}

impl ApiError {
    pub fn code_str(&self) -> &str {
        match self {
            ApiError::MalformedRequest { code, .. }
            | ApiError::AccessDenied { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::StoreUnavailable { code, .. }
            | ApiError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::MalformedRequest { message, .. }
            | ApiError::AccessDenied { message, .. }
            | ApiError::NotFound { message, .. }
            | ApiError::StoreUnavailable { message, .. }
            | ApiError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        ApiError::MalformedRequest { code: "bad_request".into(), message: msg.into() }
    }

    /// Every authentication or authorization failure renders this exact value,
    /// whatever the internal cause.
    pub fn access_denied() -> Self {
        ApiError::AccessDenied { code: "access_denied".into(), message: "could not authenticate".into() }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        ApiError::NotFound { code: "not_found".into(), message: msg.into() }
    }

    pub fn store_unavailable<S: Into<String>>(msg: S) -> Self {
        ApiError::StoreUnavailable { code: "store_unavailable".into(), message: msg.into() }
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        ApiError::Internal { code: "internal".into(), message: msg.into() }
    }

    /// Map to HTTP status code. Unknown records surface as 400 on this API.
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::MalformedRequest { .. } => 400,
            ApiError::AccessDenied { .. } => 403,
            ApiError::NotFound { .. } => 400,
            ApiError::StoreUnavailable { .. } => 500,
            ApiError::Internal { .. } => 500,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.http_status() >= 500 {
            error!(target: "rollcall::http", "request failed: {}", self);
        }
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message()
        }));
        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed => ApiError::access_denied(),
            AuthError::Store(e) => ApiError::store_unavailable(e.to_string()),
        }
    }
}

impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::NotFound => ApiError::not_found("no matching record"),
            RosterError::DuplicateEmail => ApiError::malformed("email is already registered"),
            RosterError::DuplicateGroupName => ApiError::malformed("group name is already taken"),
            RosterError::Store(e) => ApiError::store_unavailable(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::store_unavailable(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::malformed(err.to_string())
    }
}
