//! Error types for the Turnstile gate.
//!
//! The gate distinguishes recoverable client input errors (mapped to HTTP
//! status codes) from upstream contract violations (unrecoverable: the
//! authentication collaborator is misconfigured and must be fixed, not
//! retried). Both are carried by one tagged enum rather than an exception
//! hierarchy, and converted to responses via `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CONFLICT BODY
// ============================================================================

/// JSON body returned with a 409 when a live reservation already exists.
///
/// Names the existing reservation so the client can tell which of its
/// attempts was accepted and when it may safely retry with a fresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBody {
    /// Fixed explanatory string.
    pub message: String,

    /// Normalized request path the reservation was taken against.
    pub uri: String,

    /// The client-supplied idempotency token.
    pub client_idempotency_token: String,

    /// The authenticated caller identity.
    pub client_identity: String,

    /// When the existing reservation expires (ISO-8601 instant).
    pub expires: DateTime<Utc>,
}

// ============================================================================
// GATE ERROR
// ============================================================================

/// Errors produced by the idempotency gate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateError {
    /// The idempotency token failed presence or shape validation.
    /// Client error: 400, plain-text reason.
    #[error("idempotency token rejected: {0}")]
    InvalidToken(String),

    /// A live reservation already exists for this (route, token, caller).
    /// Client error: 409, structured body naming the reservation.
    #[error("duplicate create request for {}", .0.uri)]
    Duplicate(Box<ConflictBody>),

    /// Caller identity was missing or blank. This is an upstream contract
    /// violation: the authentication collaborator must run before the gate
    /// and is misconfigured, so the request aborts with an internal error.
    #[error("caller identity contract violated: {0}")]
    ContractViolation(&'static str),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            GateError::InvalidToken(reason) => {
                tracing::info!(%reason, "Rejected create request with invalid idempotency token");
                (StatusCode::BAD_REQUEST, reason).into_response()
            }
            GateError::Duplicate(body) => {
                tracing::info!(
                    uri = %body.uri,
                    client_identity = %body.client_identity,
                    expires = %body.expires,
                    "Suppressed duplicate create request"
                );
                (StatusCode::CONFLICT, Json(*body)).into_response()
            }
            GateError::ContractViolation(detail) => {
                tracing::error!(%detail, "Idempotency gate contract violation");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

// ============================================================================
// STARTUP ERROR
// ============================================================================

/// Fatal errors raised while bootstrapping the server binary.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Settings failed bounds validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The bind address could not be resolved.
    #[error("invalid bind address: {0}")]
    Bind(String),

    /// Listener or server I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
