//! Cache capability trait for idempotency reservations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Abstract reservation store keyed by a composite string.
///
/// Implementations must be thread-safe: the gate shares one instance across
/// all in-flight requests (`Arc<dyn IdempotencyCache>`) and calls `lookup`
/// and `reserve` concurrently.
///
/// # Cancellation
///
/// Both operations are plain futures. Dropping the future (e.g. from a
/// `tokio::select!` or a timeout layer) must abort the operation promptly and
/// leave the store consistent: a key's value is only ever whole-assigned,
/// never partially mutated.
///
/// # Overload behavior
///
/// `reserve` is allowed to silently drop a reservation when the store is at
/// capacity. This is documented behavior, not an error: callers must tolerate
/// a false negative on a subsequent `lookup` under sustained overload, which
/// means a retried create might be re-executed while the store is full.
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    /// Return the stored expiration if a live reservation exists for `key`.
    ///
    /// An entry whose stored expiration has already passed is reported as
    /// absent even if the backing store has not physically evicted it yet.
    async fn lookup(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Store or overwrite the reservation for `key`.
    ///
    /// May be a no-op when the store is at capacity; see the trait docs.
    async fn reserve(&self, key: &str, expires_at: DateTime<Utc>);
}
