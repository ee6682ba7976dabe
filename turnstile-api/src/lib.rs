//! Turnstile - Idempotency Gate for Create Requests
//!
//! This crate provides an axum middleware that gives non-idempotent create
//! operations exactly-once-apparent semantics across unreliable network
//! round-trips, backed by the pluggable reservation cache in
//! `turnstile-cache`.
//!
//! A client attaches an `X-Idempotency-Token` header to a POST; once that
//! (route, token, caller) triple has been accepted, a retry is answered with
//! 409 and the existing reservation's expiration instead of being re-executed.
//! Only the fact of acceptance is remembered, never the response body, and
//! all state is in-memory and lost on restart.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod validation;

// Re-export commonly used types
pub use config::{ConfigError, Settings};
pub use constants::{
    CONFLICT_MESSAGE, IDEMPOTENCY_EXPIRES_HEADER, IDEMPOTENCY_TOKEN_HEADER, KEY_DELIMITER,
};
pub use error::{ConflictBody, GateError, StartupError};
pub use identity::{header_identity, CallerIdentity, CALLER_IDENTITY_HEADER};
pub use middleware::{idempotency_gate, reservation_key, validate_token, GateState};
