//! Middleware for the Turnstile gate.
//!
//! # Middleware Order
//!
//! The authentication collaborator must run before the gate so that
//! [`crate::identity::CallerIdentity`] is present in the request extensions
//! when the gate composes the reservation key:
//!
//! ```ignore
//! Router::new()
//!     .route("/orders", post(handler))
//!     // Innermost (runs last on request)
//!     .layer(middleware::from_fn_with_state(gate_state, idempotency_gate))
//!     // Authentication runs before the gate (provides caller identity)
//!     .layer(middleware::from_fn(header_identity))
//!     // Outermost
//! ```

pub mod idempotency;

pub use idempotency::{idempotency_gate, reservation_key, validate_token, GateState};
