//! Idempotency gate for create requests.
//!
//! Gives non-idempotent create operations exactly-once-apparent semantics
//! across unreliable network round-trips. A client attaches an idempotency
//! token to a POST; once the gate has seen that (route, token, caller) triple
//! and the downstream operation did not fail, a retry is rejected with 409
//! instead of being re-executed.
//!
//! Only the *fact* of acceptance is remembered, never the response body.
//! The gate is a single-pass decision point: it performs no retries and
//! caches nothing else.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{middleware, routing::post, Router};
//! use turnstile_api::middleware::{idempotency_gate, GateState};
//!
//! let state = GateState::new(cache, settings);
//!
//! let app = Router::new()
//!     .route("/orders", post(create_order))
//!     .layer(middleware::from_fn_with_state(state, idempotency_gate));
//! ```
//!
//! # Concurrency
//!
//! The lookup-then-reserve window is deliberately not closed with a single
//! atomic operation: two near-simultaneous first-time requests for the same
//! key can both pass the lookup and both run downstream, the later commit
//! winning. Duplicate suppression targets *sequential* client retries, not
//! strict mutual exclusion.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::HeaderValue, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, SecondsFormat, Utc};
use turnstile_cache::IdempotencyCache;

use crate::config::Settings;
use crate::constants::{
    CONFLICT_MESSAGE, IDEMPOTENCY_EXPIRES_HEADER, IDEMPOTENCY_TOKEN_HEADER, KEY_DELIMITER,
};
use crate::error::{ConflictBody, GateError};
use crate::identity::CallerIdentity;

// ============================================================================
// STATE
// ============================================================================

/// Shared state for the idempotency gate.
///
/// Cheap to clone per request; the cache is the single shared instance for
/// the process lifetime.
#[derive(Clone)]
pub struct GateState {
    /// Reservation store (swappable backend).
    pub cache: Arc<dyn IdempotencyCache>,

    /// Validated gate settings.
    pub settings: Arc<Settings>,
}

impl GateState {
    /// Create gate state over the given reservation cache.
    pub fn new(cache: Arc<dyn IdempotencyCache>, settings: Settings) -> Self {
        Self {
            cache,
            settings: Arc::new(settings),
        }
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Axum middleware implementing the idempotency gate.
///
/// Per-request state machine:
///
/// 1. Non-POST requests pass through unmodified.
/// 2. The `X-Idempotency-Token` header is validated: present, non-blank,
///    length within the configured bounds, no delimiter character.
///    Any violation → 400 with a plain-text reason.
/// 3. Caller identity must be present and non-blank, else the request aborts
///    with an internal error (upstream contract violation).
/// 4. The reservation key is composed from (path, token, identity).
/// 5. A live reservation → 409 naming the existing reservation.
/// 6. Otherwise the expiration is computed, the token and expiration are
///    attached to the response headers, and the downstream operation runs.
/// 7. The reservation is committed only if the downstream status is < 300;
///    a failed operation may be safely retried with the same token.
pub async fn idempotency_gate(
    State(state): State<GateState>,
    request: Request,
    next: Next,
) -> Result<Response, GateError> {
    if !is_create_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let token = extract_token(request.headers(), &state.settings)?;
    let identity = extract_identity(&request)?;
    let path = request.uri().path().to_owned();
    let key = reservation_key(&path, &token, &identity);

    if let Some(expires) = state.cache.lookup(&key).await {
        return Err(GateError::Duplicate(Box::new(ConflictBody {
            message: CONFLICT_MESSAGE.to_string(),
            uri: path,
            client_idempotency_token: token,
            client_identity: identity,
            expires,
        })));
    }

    let expires_at = Utc::now() + state.settings.reservation_lifetime();

    let mut response = next.run(request).await;
    attach_reservation_headers(response.headers_mut(), &token, expires_at);

    if response.status().as_u16() < 300 {
        state.cache.reserve(&key, expires_at).await;
        tracing::debug!(
            path = %path,
            identity = %identity,
            expires = %expires_at,
            "Reservation committed"
        );
    } else {
        tracing::debug!(
            path = %path,
            identity = %identity,
            status = %response.status(),
            "Downstream failed, reservation not committed"
        );
    }

    Ok(response)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Whether the request is a create operation the gate must intercept.
fn is_create_method(method: &Method) -> bool {
    *method == Method::POST
}

/// Validate the shape of a client-supplied idempotency token.
///
/// The delimiter check is what keeps the reservation key unambiguous: a token
/// containing the delimiter could make two distinct tokens collide into one
/// key.
pub fn validate_token(token: &str, settings: &Settings) -> Result<(), GateError> {
    if token.trim().is_empty() {
        return Err(GateError::InvalidToken(format!(
            "header '{IDEMPOTENCY_TOKEN_HEADER}' must not be blank"
        )));
    }

    let length = token.chars().count();
    if length < settings.token_min_length || length > settings.token_max_length {
        return Err(GateError::InvalidToken(format!(
            "idempotency token must be between {} and {} characters, got {}",
            settings.token_min_length, settings.token_max_length, length
        )));
    }

    if token.contains(KEY_DELIMITER) {
        return Err(GateError::InvalidToken(format!(
            "idempotency token must not contain '{KEY_DELIMITER}'"
        )));
    }

    Ok(())
}

/// Extract and validate the idempotency token from the request headers.
fn extract_token(headers: &HeaderMap, settings: &Settings) -> Result<String, GateError> {
    let value = headers.get(IDEMPOTENCY_TOKEN_HEADER).ok_or_else(|| {
        GateError::InvalidToken(format!(
            "header '{IDEMPOTENCY_TOKEN_HEADER}' is required on create requests"
        ))
    })?;

    let token = value.to_str().map_err(|_| {
        GateError::InvalidToken(format!(
            "header '{IDEMPOTENCY_TOKEN_HEADER}' must be visible ASCII"
        ))
    })?;

    validate_token(token, settings)?;
    Ok(token.to_owned())
}

/// Extract the pre-authenticated caller identity from request extensions.
fn extract_identity(request: &Request) -> Result<String, GateError> {
    request
        .extensions()
        .get::<CallerIdentity>()
        .map(|identity| identity.as_str().to_owned())
        .filter(|subject| !subject.trim().is_empty())
        .ok_or(GateError::ContractViolation(
            "caller identity missing or blank; authentication must run before the idempotency gate",
        ))
}

/// Compose the reservation key from path, token, and caller identity.
pub fn reservation_key(path: &str, token: &str, identity: &str) -> String {
    format!("{path}{KEY_DELIMITER}{token}{KEY_DELIMITER}{identity}")
}

/// Echo the token and advertise the reservation expiration on the response.
fn attach_reservation_headers(headers: &mut HeaderMap, token: &str, expires_at: DateTime<Utc>) {
    if let Ok(value) = HeaderValue::from_str(token) {
        headers.insert(IDEMPOTENCY_TOKEN_HEADER, value);
    }
    let expires = expires_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    if let Ok(value) = HeaderValue::from_str(&expires) {
        headers.insert(IDEMPOTENCY_EXPIRES_HEADER, value);
    }
}

// ============================================================================
// TESTS
// ============================================================================
