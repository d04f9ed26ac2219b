//! Test fixtures and session helpers.
//!
//! Provides a ready-made federation with a few accounts and a session
//! wired to it.

use crate::federation::FakeFederation;
use std::sync::Arc;
use wididit_core::{Config, User, Wididit};

/// Host every seeded account lives on.
pub const TEST_HOST: &str = "test.wididit.net";

/// A second host, for cross-host scenarios.
pub const OTHER_HOST: &str = "test2.wididit.net";

/// Password of every seeded account.
pub const TEST_PASSWORD: &str = "password";

/// Usernames seeded on [`TEST_HOST`].
pub const TEST_USERS: [&str; 3] = ["tester", "alice", "bob"];

/// A session talking to its own in-memory federation.
pub struct TestFederation {
    /// The fake server side.
    pub federation: Arc<FakeFederation>,
    /// The client session.
    pub wididit: Wididit,
}

impl TestFederation {
    /// Creates a federation with the [`TEST_USERS`] accounts.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Same as [`TestFederation::new`] with a custom client configuration.
    pub fn with_config(config: Config) -> Self {
        let federation = Arc::new(FakeFederation::new());
        for username in TEST_USERS {
            federation.add_user(username, TEST_HOST, TEST_PASSWORD);
        }
        let wididit = Wididit::new(config, Arc::clone(&federation));
        Self {
            federation,
            wididit,
        }
    }

    /// Builds a seeded user and connects its server as them.
    pub fn connect(&self, username: &str) -> Arc<User> {
        self.wididit
            .user(username, TEST_HOST)
            .password(TEST_PASSWORD)
            .connect(true)
            .build()
            .expect("Failed to connect seeded user")
    }

    /// Builds a seeded user without connecting.
    pub fn user(&self, username: &str) -> Arc<User> {
        self.wididit
            .user(username, TEST_HOST)
            .build()
            .expect("Failed to build seeded user")
    }
}

impl Default for TestFederation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestFederation {
    type Target = Wididit;

    fn deref(&self) -> &Self::Target {
        &self.wididit
    }
}

/// Runs a test against a fresh seeded federation.
///
/// # Example
///
/// ```rust
/// use wididit_testkit::with_session;
///
/// with_session(|wididit, federation| {
///     let tester = wididit.user("tester", "test.wididit.net").build().unwrap();
///     assert_eq!(federation.biography(&tester.userid()), Some(tester.biography()));
/// });
/// ```
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&Wididit, &FakeFederation) -> R,
{
    let test = TestFederation::new();
    f(&test.wididit, &test.federation)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use serde_json::json;

    /// Seeds `per_user` entries for every test user, with contents
    /// `"{username} entry {n}"`.
    pub fn populated_federation(per_user: usize) -> TestFederation {
        let test = TestFederation::new();
        for username in TEST_USERS {
            let userid = format!("{username}@{TEST_HOST}");
            for n in 1..=per_user {
                test.federation.add_entry(
                    &userid,
                    json!({
                        "content": format!("{username} entry {n}"),
                        "title": format!("entry {n}"),
                        "generator": "testkit",
                    }),
                );
            }
        }
        test
    }

    /// Like [`populated_federation`], with tester subscribed to alice and
    /// bob sharing alice's first entry.
    pub fn social_federation(per_user: usize) -> TestFederation {
        let test = populated_federation(per_user);
        let tester = format!("tester@{TEST_HOST}");
        let alice = format!("alice@{TEST_HOST}");
        let bob = format!("bob@{TEST_HOST}");
        test.federation.subscribe(&tester, &alice);
        test.federation.subscribe(&tester, &bob);
        test.federation.share(&bob, &alice, 1);
        test
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_users() {
        let test = TestFederation::new();
        let tester = test.user("tester");
        assert_eq!(tester.biography(), "biography of user tester@test.wididit.net");
    }

    #[test]
    fn test_connect() {
        let test = TestFederation::new();
        let alice = test.connect("alice");
        assert!(alice.is_authenticated().unwrap());
    }

    #[test]
    fn test_populated_scenario() {
        let test = scenarios::populated_federation(2);
        assert_eq!(test.federation.entry_count(), 6);
    }
}
