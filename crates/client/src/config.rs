//! Connection settings.

use std::time::Duration;

use model::ConfigurationError;

/// Environment variable holding the server URL.
pub const URL_ENV: &str = "COUCHDB_URL";
/// Environment variable holding the user name for Basic authentication.
pub const USER_ENV: &str = "COUCHDB_USER";
/// Environment variable holding the password for Basic authentication.
pub const PASSWORD_ENV: &str = "COUCHDB_PASSWORD";
/// Environment variable holding the request timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "COUCHDB_TIMEOUT_SECS";

/// URL used when none is configured.
pub const DEFAULT_URL: &str = "http://127.0.0.1:5984";

/// Where the server is and how to talk to it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the server, optionally with a path prefix.
    pub url: String,
    /// Default deadline for each request; `None` disables it.
    pub timeout: Option<Duration>,
    /// User name for Basic authentication.
    pub username: Option<String>,
    /// Password for Basic authentication.
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: None,
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their defaults. A timeout of `0` disables the
    /// deadline.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let mut config = Self::default();

        if let Some(url) = lookup(URL_ENV).filter(|v| !v.is_empty()) {
            config.url = url;
        }
        config.username = lookup(USER_ENV).filter(|v| !v.is_empty());
        config.password = lookup(PASSWORD_ENV);

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigurationError::InvalidValue {
                    key: TIMEOUT_ENV,
                    message: format!("expected whole seconds, got '{raw}'"),
                })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.url, DEFAULT_URL);
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            (URL_ENV, "http://couch.internal:5984/"),
            (USER_ENV, "admin"),
            (PASSWORD_ENV, "s3cret"),
            (TIMEOUT_ENV, "30"),
        ]))
        .unwrap();

        assert_eq!(config.url, "http://couch.internal:5984/");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn zero_timeout_disables_the_deadline() {
        let config = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "0")])).unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { key: TIMEOUT_ENV, .. }));
    }
}
