//! Records returned by the catalog and the session handle used to talk to it.

use super::*;

/// A single catalog search result, one edition of one book.
///
/// Only the identifier, titles and authors are read by this crate. Titles and authors are
/// kept exactly as the catalog supplied them since exact membership queries are built from
/// them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
  /// The catalog's identifier for this volume
  pub volume_id: String,
  /// Every title the catalog lists for the volume
  pub titles:    Vec<String>,
  /// Every author or creator the catalog lists for the volume
  pub authors:   Vec<String>,
}

impl VolumeRecord {
  /// Creates a record from its parts.
  pub fn new(volume_id: impl Into<String>, titles: Vec<String>, authors: Vec<String>) -> Self {
    Self { volume_id: volume_id.into(), titles, authors }
  }

  /// The first listed title, if there is one.
  pub fn title(&self) -> Option<&str> { self.titles.first().map(String::as_str) }
}

/// An authenticated session handle handed out by a [`CatalogService`].
///
/// The token is opaque to the browser and is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
  /// Service-issued authorization token
  token: String,
}

impl Session {
  /// Wraps a service-issued token.
  pub fn new(token: impl Into<String>) -> Self { Self { token: token.into() } }

  /// The raw token, for building authorization headers.
  pub fn token(&self) -> &str { &self.token }
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Session").field("token", &"<redacted>").finish()
  }
}
