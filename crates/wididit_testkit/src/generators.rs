//! Property-based test generators using proptest.
//!
//! Provides strategies for identities and entry fields that respect the
//! limits the client enforces locally.

use proptest::prelude::*;
use wididit_core::{MAX_TAG_LENGTH, MAX_USERNAME_LENGTH};

/// Strategy for generating valid usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_-]{3,32}").expect("Invalid regex")
}

/// Strategy for generating usernames the server would refuse.
pub fn invalid_username_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z0-9]{0,2}").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{1,8}[A-Z @./][a-z]{1,8}").expect("Invalid regex"),
        Just("x".repeat(MAX_USERNAME_LENGTH + 1)),
    ]
}

/// Strategy for generating hostnames.
pub fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,15}(\\.[a-z][a-z0-9]{0,15}){1,3}")
        .expect("Invalid regex")
}

/// Strategy for generating `username@hostname` pairs.
pub fn userid_strategy() -> impl Strategy<Value = (String, String)> {
    (username_strategy(), hostname_strategy())
}

/// Strategy for generating entry contents.
pub fn content_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 .,!?'-]{0,200}").expect("Invalid regex")
}

/// Strategy for generating categories within the tag limit.
pub fn category_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('a', 'z'), 0..=MAX_TAG_LENGTH)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
