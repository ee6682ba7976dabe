//! Property tests for idempotency token validation.

use proptest::prelude::*;

use turnstile_api::{validate_token, Settings};

fn bounded_settings() -> Settings {
    Settings {
        token_min_length: 4,
        token_max_length: 32,
        ..Settings::default()
    }
}

proptest! {
    #[test]
    fn tokens_of_valid_shape_always_validate(token in "[A-Za-z0-9_-]{4,32}") {
        prop_assert!(validate_token(&token, &bounded_settings()).is_ok());
    }

    #[test]
    fn tokens_containing_the_delimiter_never_validate(
        prefix in "[A-Za-z0-9]{2,8}",
        suffix in "[A-Za-z0-9]{2,8}",
    ) {
        // Total length stays inside [4, 32]: rejection is about the delimiter.
        let token = format!("{prefix}|{suffix}");
        prop_assert!(validate_token(&token, &bounded_settings()).is_err());
    }

    #[test]
    fn undersized_tokens_never_validate(token in "[A-Za-z0-9]{1,3}") {
        prop_assert!(validate_token(&token, &bounded_settings()).is_err());
    }

    #[test]
    fn oversized_tokens_never_validate(token in "[A-Za-z0-9]{33,64}") {
        prop_assert!(validate_token(&token, &bounded_settings()).is_err());
    }
}
