//! Client configuration.

use crate::registry::IdentityMode;
use std::time::Duration;

/// Placeholder substituted with a server's hostname in API base templates.
pub const HOSTNAME_PLACEHOLDER: &str = "{hostname}";

/// Configuration for a [`crate::Wididit`] session.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL scheme used to reach servers.
    pub scheme: String,

    /// Path of the JSON API on every server.
    pub api_path: String,

    /// Replaces the computed API base for every server.
    ///
    /// May contain `{hostname}`, which is substituted per server. Meant for
    /// pointing the client at a local test instance.
    pub api_base_override: Option<String>,

    /// Request timeout handed to the HTTP client.
    pub timeout: Duration,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Generator tag attached to entries created without one.
    pub default_generator: String,

    /// Identity policy of each entity type.
    pub identity: IdentityModes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            api_path: "/api/json".to_string(),
            api_base_override: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("wididit-rs/{}", env!("CARGO_PKG_VERSION")),
            default_generator: "Wididit Rust library".to_string(),
            identity: IdentityModes::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URL scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the API path.
    #[must_use]
    pub fn with_api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    /// Overrides the API base of every server.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base_override = Some(base.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the default generator tag.
    #[must_use]
    pub fn with_default_generator(mut self, generator: impl Into<String>) -> Self {
        self.default_generator = generator.into();
        self
    }

    /// Sets the identity modes of all entity types.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityModes) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the API base for the given hostname.
    pub fn api_base_for(&self, hostname: &str) -> String {
        match &self.api_base_override {
            Some(template) => template.replace(HOSTNAME_PLACEHOLDER, hostname),
            None => format!("{}://{}{}", self.scheme, hostname, self.api_path),
        }
    }
}

/// Per-type identity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityModes {
    /// Policy for servers.
    pub server: IdentityMode,
    /// Policy for users.
    pub user: IdentityMode,
    /// Policy for entries.
    pub entry: IdentityMode,
}

impl Default for IdentityModes {
    fn default() -> Self {
        Self {
            // connected_as must be visible to every entity on a host
            server: IdentityMode::SharedInstance,
            user: IdentityMode::ValueEqualityOnly,
            entry: IdentityMode::SharedInstance,
        }
    }
}

impl IdentityModes {
    /// Every type shares one instance per identity.
    #[must_use]
    pub const fn all_shared() -> Self {
        Self {
            server: IdentityMode::SharedInstance,
            user: IdentityMode::SharedInstance,
            entry: IdentityMode::SharedInstance,
        }
    }

    /// Sets the policy for users.
    #[must_use]
    pub const fn with_user(mut self, mode: IdentityMode) -> Self {
        self.user = mode;
        self
    }

    /// Sets the policy for entries.
    #[must_use]
    pub const fn with_entry(mut self, mode: IdentityMode) -> Self {
        self.entry = mode;
        self
    }

    /// Sets the policy for servers.
    #[must_use]
    pub const fn with_server(mut self, mode: IdentityMode) -> Self {
        self.server = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_base() {
        let config = Config::default();
        assert_eq!(
            config.api_base_for("test.wididit.net"),
            "http://test.wididit.net/api/json"
        );
    }

    #[test]
    fn config_builder() {
        let config = Config::new()
            .with_scheme("https")
            .with_timeout(Duration::from_secs(5))
            .with_default_generator("my client")
            .with_user_agent("my-agent/1.0");

        assert_eq!(config.api_base_for("a.b"), "https://a.b/api/json");
        assert_eq!(config.user_agent, "my-agent/1.0");
        let config = config.with_api_path("/api/v2");
        assert_eq!(config.api_base_for("a.b"), "https://a.b/api/v2");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.default_generator, "my client");
    }

    #[test]
    fn api_base_override_template() {
        let config = Config::new().with_api_base("http://127.0.0.1:8080/{hostname}/api");
        assert_eq!(
            config.api_base_for("test.wididit.net"),
            "http://127.0.0.1:8080/test.wididit.net/api"
        );

        let config = Config::new().with_api_base("http://localhost:9000/api/json");
        assert_eq!(config.api_base_for("x.y"), "http://localhost:9000/api/json");
    }

    #[test]
    fn identity_defaults() {
        let modes = IdentityModes::default();
        assert_eq!(modes.server, IdentityMode::SharedInstance);
        assert_eq!(modes.user, IdentityMode::ValueEqualityOnly);
        assert_eq!(modes.entry, IdentityMode::SharedInstance);

        let modes = IdentityModes::all_shared();
        assert_eq!(modes.user, IdentityMode::SharedInstance);
    }
}
