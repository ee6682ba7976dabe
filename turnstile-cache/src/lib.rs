//! Turnstile Cache - Reservation Store for the Idempotency Gate
//!
//! Defines the cache abstraction the idempotency gate reserves through, plus
//! the bounded in-memory implementation used by a single-process deployment.
//!
//! A reservation maps a composite key (route, client token, caller identity)
//! to the instant the reservation expires. The gate records a reservation
//! after a create operation succeeds; any later request carrying the same key
//! is rejected as a duplicate until the reservation expires.
//!
//! The backend is pluggable: a distributed store (e.g. an external key-value
//! service) can satisfy [`IdempotencyCache`] without any change to the gate.

pub mod memory;
pub mod traits;

pub use memory::{
    CacheMetrics, CacheMetricsSnapshot, InMemoryIdempotencyCache, MemoryCacheConfig,
};
pub use traits::IdempotencyCache;
