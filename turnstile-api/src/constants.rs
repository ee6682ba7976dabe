//! Constants for the Turnstile gate.
//!
//! Centralizes header names, the key delimiter, and the declared bounds and
//! defaults for every setting so they are easy to find, modify, and test.

// ============================================================================
// HEADERS
// ============================================================================

/// Request header carrying the client-generated idempotency token.
/// Echoed on the response of a provisionally-accepted create request.
pub const IDEMPOTENCY_TOKEN_HEADER: &str = "x-idempotency-token";

/// Response header carrying the reservation expiration (ISO-8601 instant).
pub const IDEMPOTENCY_EXPIRES_HEADER: &str = "x-idempotency-token-expires";

// ============================================================================
// KEY COMPOSITION
// ============================================================================

/// Delimiter joining path, token, and caller identity into a reservation key.
/// Disallowed inside the token so two distinct tokens can never collide into
/// one key.
pub const KEY_DELIMITER: char = '|';

// ============================================================================
// CONFLICT RESPONSE
// ============================================================================

/// Fixed explanatory string returned in the 409 conflict body.
pub const CONFLICT_MESSAGE: &str =
    "A create request with this idempotency token was already accepted for this caller and route; \
     the operation was not repeated. Retry with a new token, or wait for the reservation to expire.";

// ============================================================================
// RESERVATION LIFETIME
// ============================================================================

/// Default reservation lifetime in hours (24 hours)
pub const DEFAULT_RESERVATION_LIFETIME_HOURS: u64 = 24;

/// Minimum allowed reservation lifetime in hours (1 hour)
pub const MIN_RESERVATION_LIFETIME_HOURS: u64 = 1;

/// Maximum allowed reservation lifetime in hours (1 week)
pub const MAX_RESERVATION_LIFETIME_HOURS: u64 = 168;

// ============================================================================
// TOKEN LENGTH
// ============================================================================

/// Default minimum token length in characters
pub const DEFAULT_TOKEN_MIN_LENGTH: usize = 1;

/// Default maximum token length in characters
pub const DEFAULT_TOKEN_MAX_LENGTH: usize = 128;

/// Smallest value either token length bound may take
pub const MIN_TOKEN_LENGTH_BOUND: usize = 1;

/// Largest value either token length bound may take
pub const MAX_TOKEN_LENGTH_BOUND: usize = 128;

// ============================================================================
// IN-MEMORY CACHE
// ============================================================================

/// Default physical entry lifetime in seconds (1 hour)
pub const DEFAULT_CACHE_LIFETIME_SECS: u64 = 3600;

/// Minimum allowed physical entry lifetime in seconds (1 second)
pub const MIN_CACHE_LIFETIME_SECS: u64 = 1;

/// Maximum allowed physical entry lifetime in seconds (24 hours)
pub const MAX_CACHE_LIFETIME_SECS: u64 = 86400;

/// Default cache capacity in entries
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Minimum allowed cache capacity
pub const MIN_CACHE_CAPACITY: usize = 1;

/// Maximum allowed cache capacity
pub const MAX_CACHE_CAPACITY: usize = 4096;

/// Default eviction scan interval in seconds (1 minute)
pub const DEFAULT_EVICTION_SCAN_INTERVAL_SECS: u64 = 60;

/// Minimum allowed eviction scan interval in seconds (1 second)
pub const MIN_EVICTION_SCAN_INTERVAL_SECS: u64 = 1;

/// Maximum allowed eviction scan interval in seconds (1 hour)
pub const MAX_EVICTION_SCAN_INTERVAL_SECS: u64 = 3600;
