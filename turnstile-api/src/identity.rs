//! Caller identity boundary.
//!
//! Authentication is an external collaborator: whatever authenticates the
//! request must insert a [`CallerIdentity`] into the request extensions
//! before the idempotency gate runs. The gate treats a missing or blank
//! identity as a contract violation, not a client error.

use std::fmt;

use axum::{extract::Request, middleware::Next, response::Response};

/// Header read by [`header_identity`], the development identity adapter.
pub const CALLER_IDENTITY_HEADER: &str = "x-caller-identity";

/// Opaque, pre-authenticated identifier of the requesting party.
///
/// Produced by the authentication layer and consumed by the idempotency
/// gate as one component of the reservation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Wrap an authenticated subject string.
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Development stand-in for a real authenticator.
///
/// Trusts the `X-Caller-Identity` header and copies it into the request
/// extensions. Suitable only for local development and tests; a production
/// deployment replaces this with its real authentication middleware, which
/// must insert [`CallerIdentity`] the same way.
pub async fn header_identity(mut request: Request, next: Next) -> Response {
    if let Some(subject) = request
        .headers()
        .get(CALLER_IDENTITY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_owned())
    {
        request
            .extensions_mut()
            .insert(CallerIdentity::new(subject));
    }
    next.run(request).await
}
