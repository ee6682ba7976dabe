//! Gate configuration.
//!
//! Settings are loaded from environment variables with defaults from
//! [`crate::constants`], then validated once at process start against the
//! declared bounds. An out-of-range value is a fatal startup error: the gate
//! never runs with undefined behavior.

use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;
use turnstile_cache::MemoryCacheConfig;

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_LIFETIME_SECS, DEFAULT_EVICTION_SCAN_INTERVAL_SECS,
    DEFAULT_RESERVATION_LIFETIME_HOURS, DEFAULT_TOKEN_MAX_LENGTH, DEFAULT_TOKEN_MIN_LENGTH,
    MAX_CACHE_CAPACITY, MAX_CACHE_LIFETIME_SECS, MAX_EVICTION_SCAN_INTERVAL_SECS,
    MAX_RESERVATION_LIFETIME_HOURS, MAX_TOKEN_LENGTH_BOUND, MIN_CACHE_CAPACITY,
    MIN_CACHE_LIFETIME_SECS, MIN_EVICTION_SCAN_INTERVAL_SECS, MIN_RESERVATION_LIFETIME_HOURS,
    MIN_TOKEN_LENGTH_BOUND,
};
use crate::validation::ValidateRange;

// ============================================================================
// ERRORS
// ============================================================================

/// Configuration validation failure.
///
/// Always fatal: returned from [`Settings::validate`] at startup and never
/// surfaced to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setting is outside its declared bounds.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    /// The token length bounds are inverted.
    #[error("token_min_length ({min}) must not exceed token_max_length ({max})")]
    InvertedTokenBounds { min: usize, max: usize },
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Immutable per-process configuration for the idempotency gate and the
/// in-memory reservation cache.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Reservation window communicated to clients, in hours.
    pub reservation_lifetime_hours: u64,

    /// Minimum accepted token length in characters.
    pub token_min_length: usize,

    /// Maximum accepted token length in characters.
    pub token_max_length: usize,

    /// Physical lifetime of a cache entry, in seconds.
    pub cache_lifetime_secs: u64,

    /// Maximum number of reservations the in-memory cache holds.
    pub cache_capacity: usize,

    /// Cadence of the background eviction scan, in seconds.
    pub eviction_scan_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reservation_lifetime_hours: DEFAULT_RESERVATION_LIFETIME_HOURS,
            token_min_length: DEFAULT_TOKEN_MIN_LENGTH,
            token_max_length: DEFAULT_TOKEN_MAX_LENGTH,
            cache_lifetime_secs: DEFAULT_CACHE_LIFETIME_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            eviction_scan_interval_secs: DEFAULT_EVICTION_SCAN_INTERVAL_SECS,
        }
    }
}

impl Settings {
    /// Create Settings from environment variables.
    ///
    /// Environment variables:
    /// - `TURNSTILE_RESERVATION_LIFETIME_HOURS`: reservation window (default: 24)
    /// - `TURNSTILE_TOKEN_MIN_LENGTH`: minimum token length (default: 1)
    /// - `TURNSTILE_TOKEN_MAX_LENGTH`: maximum token length (default: 128)
    /// - `TURNSTILE_CACHE_LIFETIME_SECS`: physical entry lifetime (default: 3600)
    /// - `TURNSTILE_CACHE_CAPACITY`: cache capacity in entries (default: 4096)
    /// - `TURNSTILE_EVICTION_SCAN_INTERVAL_SECS`: eviction cadence (default: 60)
    ///
    /// Values that fail to parse fall back to the default; out-of-range values
    /// are caught by [`Settings::validate`] at startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            reservation_lifetime_hours: env_parsed(
                "TURNSTILE_RESERVATION_LIFETIME_HOURS",
                defaults.reservation_lifetime_hours,
            ),
            token_min_length: env_parsed("TURNSTILE_TOKEN_MIN_LENGTH", defaults.token_min_length),
            token_max_length: env_parsed("TURNSTILE_TOKEN_MAX_LENGTH", defaults.token_max_length),
            cache_lifetime_secs: env_parsed(
                "TURNSTILE_CACHE_LIFETIME_SECS",
                defaults.cache_lifetime_secs,
            ),
            cache_capacity: env_parsed("TURNSTILE_CACHE_CAPACITY", defaults.cache_capacity),
            eviction_scan_interval_secs: env_parsed(
                "TURNSTILE_EVICTION_SCAN_INTERVAL_SECS",
                defaults.eviction_scan_interval_secs,
            ),
        }
    }

    /// Validate every setting against its declared bounds.
    ///
    /// Called once at process start; failure halts startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reservation_lifetime_hours.validate_range(
            "reservation_lifetime_hours",
            MIN_RESERVATION_LIFETIME_HOURS,
            MAX_RESERVATION_LIFETIME_HOURS,
        )?;
        self.token_min_length.validate_range(
            "token_min_length",
            MIN_TOKEN_LENGTH_BOUND,
            MAX_TOKEN_LENGTH_BOUND,
        )?;
        self.token_max_length.validate_range(
            "token_max_length",
            MIN_TOKEN_LENGTH_BOUND,
            MAX_TOKEN_LENGTH_BOUND,
        )?;
        if self.token_min_length > self.token_max_length {
            return Err(ConfigError::InvertedTokenBounds {
                min: self.token_min_length,
                max: self.token_max_length,
            });
        }
        self.cache_lifetime_secs.validate_range(
            "cache_lifetime_secs",
            MIN_CACHE_LIFETIME_SECS,
            MAX_CACHE_LIFETIME_SECS,
        )?;
        self.cache_capacity.validate_range(
            "cache_capacity",
            MIN_CACHE_CAPACITY,
            MAX_CACHE_CAPACITY,
        )?;
        self.eviction_scan_interval_secs.validate_range(
            "eviction_scan_interval_secs",
            MIN_EVICTION_SCAN_INTERVAL_SECS,
            MAX_EVICTION_SCAN_INTERVAL_SECS,
        )?;
        Ok(())
    }

    /// The reservation window as a chrono delta, for expiration arithmetic.
    pub fn reservation_lifetime(&self) -> TimeDelta {
        TimeDelta::hours(self.reservation_lifetime_hours as i64)
    }

    /// Configuration for the in-memory cache backend.
    pub fn memory_cache_config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig {
            capacity: self.cache_capacity,
            entry_lifetime: Duration::from_secs(self.cache_lifetime_secs),
            scan_interval: Duration::from_secs(self.eviction_scan_interval_secs),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.reservation_lifetime_hours, 24);
        assert_eq!(settings.token_min_length, 1);
        assert_eq!(settings.token_max_length, 128);
        assert_eq!(settings.cache_capacity, 4096);
    }

    #[test]
    fn test_reservation_lifetime_bounds() {
        let mut settings = Settings::default();

        settings.reservation_lifetime_hours = 0;
        assert!(settings.validate().is_err());

        settings.reservation_lifetime_hours = 169;
        assert!(settings.validate().is_err());

        settings.reservation_lifetime_hours = 1;
        assert!(settings.validate().is_ok());

        settings.reservation_lifetime_hours = 168;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_token_length_bounds() {
        let mut settings = Settings::default();

        settings.token_min_length = 0;
        assert!(settings.validate().is_err());

        settings.token_min_length = 1;
        settings.token_max_length = 129;
        assert!(settings.validate().is_err());

        settings.token_max_length = 128;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_inverted_token_bounds_rejected() {
        let settings = Settings {
            token_min_length: 32,
            token_max_length: 4,
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ConfigError::InvertedTokenBounds { min: 32, max: 4 })
        );
    }

    #[test]
    fn test_cache_bounds() {
        let mut settings = Settings::default();

        settings.cache_lifetime_secs = 0;
        assert!(settings.validate().is_err());
        settings.cache_lifetime_secs = 86401;
        assert!(settings.validate().is_err());
        settings.cache_lifetime_secs = 86400;
        assert!(settings.validate().is_ok());

        settings.cache_capacity = 0;
        assert!(settings.validate().is_err());
        settings.cache_capacity = 4097;
        assert!(settings.validate().is_err());
        settings.cache_capacity = 1;
        assert!(settings.validate().is_ok());

        settings.eviction_scan_interval_secs = 0;
        assert!(settings.validate().is_err());
        settings.eviction_scan_interval_secs = 3601;
        assert!(settings.validate().is_err());
        settings.eviction_scan_interval_secs = 3600;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_error_names_the_field() {
        let settings = Settings {
            cache_capacity: 0,
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("cache_capacity"));
    }

    #[test]
    fn test_memory_cache_config_conversion() {
        let settings = Settings {
            cache_lifetime_secs: 120,
            cache_capacity: 64,
            eviction_scan_interval_secs: 15,
            ..Settings::default()
        };
        let config = settings.memory_cache_config();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.entry_lifetime, Duration::from_secs(120));
        assert_eq!(config.scan_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_reservation_lifetime_delta() {
        let settings = Settings {
            reservation_lifetime_hours: 1,
            ..Settings::default()
        };
        assert_eq!(settings.reservation_lifetime(), TimeDelta::hours(1));
    }
}
