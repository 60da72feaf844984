//! Browser configuration.
//!
//! A [`BrowserConfig`] holds the account credentials and the minimum delay between catalog
//! requests. It can be deserialized from any serde format or read from the environment:
//!
//! | Variable                   | Meaning                                   |
//! |----------------------------|-------------------------------------------|
//! | `BOOKSHELF_USERNAME`       | Account username (required)               |
//! | `BOOKSHELF_PASSWORD`       | Account password (required)               |
//! | `BOOKSHELF_MIN_DELAY_SECS` | Seconds between requests (default: `1`)   |

use super::*;

/// Environment variable holding the account username.
pub const USERNAME_VAR: &str = "BOOKSHELF_USERNAME";
/// Environment variable holding the account password.
pub const PASSWORD_VAR: &str = "BOOKSHELF_PASSWORD";
/// Environment variable holding the minimum delay between requests, in seconds.
pub const MIN_DELAY_VAR: &str = "BOOKSHELF_MIN_DELAY_SECS";

/// Default minimum delay between two catalog requests, in seconds.
pub const DEFAULT_MIN_DELAY_SECS: u64 = 1;

/// Account credentials for the catalog service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
  /// Account username, usually an email address
  pub username: String,
  /// Account password
  pub password: String,
}

impl Credentials {
  /// Creates a credential pair.
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self { username: username.into(), password: password.into() }
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Settings for a [`CatalogBrowser`](crate::CatalogBrowser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
  /// Credentials used when signing in
  #[serde(flatten)]
  pub credentials:    Credentials,
  /// Minimum number of seconds between two catalog requests
  #[serde(default = "default_min_delay_secs")]
  pub min_delay_secs: u64,
}

/// Serde default for [`BrowserConfig::min_delay_secs`].
fn default_min_delay_secs() -> u64 { DEFAULT_MIN_DELAY_SECS }

impl BrowserConfig {
  /// Creates a configuration with the default request delay.
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self { credentials: Credentials::new(username, password), min_delay_secs: DEFAULT_MIN_DELAY_SECS }
  }

  /// Replaces the minimum delay between requests.
  pub fn with_min_delay_secs(mut self, secs: u64) -> Self {
    self.min_delay_secs = secs;
    self
  }

  /// The minimum delay between requests.
  pub fn min_delay(&self) -> Duration { Duration::from_secs(self.min_delay_secs) }

  /// Reads the configuration from `BOOKSHELF_*` environment variables.
  ///
  /// # Errors
  ///
  /// Returns [`BookshelfError::InvalidUsage`] when the username or password is missing or
  /// the delay is not a whole number of seconds.
  pub fn from_env() -> Result<Self, BookshelfError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Builds the configuration from an arbitrary key lookup.
  ///
  /// Keys are the `BOOKSHELF_*` variable names; empty values count as missing.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, BookshelfError>
  where F: Fn(&str) -> Option<String> {
    let required = |key: &str| {
      lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BookshelfError::InvalidUsage(format!("{key} is not set")))
    };

    let username = required(USERNAME_VAR)?;
    let password = required(PASSWORD_VAR)?;

    let min_delay_secs = match lookup(MIN_DELAY_VAR).filter(|value| !value.is_empty()) {
      Some(value) => value.trim().parse::<u64>().map_err(|e| {
        BookshelfError::InvalidUsage(format!("{MIN_DELAY_VAR} must be whole seconds: {e}"))
      })?,
      None => DEFAULT_MIN_DELAY_SECS,
    };

    trace!("Loaded browser configuration for {username} with {min_delay_secs}s request delay");

    Ok(Self { credentials: Credentials { username, password }, min_delay_secs })
  }
}
