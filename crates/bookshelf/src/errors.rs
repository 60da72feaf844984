//! Error types for the bookshelf library.
//!
//! Every fallible operation in the crate returns [`BookshelfError`]. The variants fall into
//! three groups:
//! - Session failures ([`BookshelfError::Authentication`])
//! - Lookup outcomes ([`BookshelfError::NotFound`]) and caller mistakes
//!   ([`BookshelfError::InvalidUsage`])
//! - Transport failures raised by the HTTP catalog client
//!
//! # Examples
//!
//! ```no_run
//! use bookshelf::{clients::GdataClient, BookshelfError, CatalogBrowser};
//!
//! # async fn example() -> Result<(), BookshelfError> {
//! let mut browser = CatalogBrowser::new(
//!   GdataClient::new()?,
//!   "reader@example.com",
//!   "hunter2",
//!   std::time::Duration::from_secs(1),
//! );
//!
//! match browser.find_best_match("Dune", "Frank Herbert").await {
//!   Ok(volume) => println!("Found {}", volume.volume_id),
//!   Err(BookshelfError::NotFound { query }) => println!("Nothing matched {query}"),
//!   Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Errors that can occur when searching the catalog or managing a bookshelf.
#[derive(Error, Debug)]
pub enum BookshelfError {
  /// Signing in failed.
  ///
  /// Raised when the credentials are rejected or when anything goes wrong on the wire during
  /// the sign-in exchange. The browser stays signed out; the next operation tries again.
  #[error("Authentication failed: {0}")]
  Authentication(String),

  /// A search returned no results.
  ///
  /// Carries the query that was sent so callers can see what the service was asked.
  #[error("No matching catalog records found using: {query}")]
  NotFound {
    /// The query string issued to the catalog
    query: String,
  },

  /// The caller handed the library something it cannot work with, such as an empty
  /// collection identifier or an incomplete configuration.
  #[error("Invalid usage: {0}")]
  InvalidUsage(String),

  /// A network request failed.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A catalog URL could not be parsed.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// A catalog feed was not well-formed XML.
  #[error(transparent)]
  Xml(#[from] quick_xml::Error),

  /// The catalog answered with an error response.
  #[error("API error: {0}")]
  ApiError(String),
}

impl BookshelfError {
  /// Checks if this error means the search came back empty.
  ///
  /// ```
  /// use bookshelf::BookshelfError;
  ///
  /// let err = BookshelfError::NotFound { query: "intitle:Dune".into() };
  /// assert!(err.is_not_found());
  /// assert_eq!(err.query(), Some("intitle:Dune"));
  /// ```
  pub fn is_not_found(&self) -> bool { matches!(self, BookshelfError::NotFound { .. }) }

  /// Checks if this error came out of the sign-in exchange.
  pub fn is_authentication_error(&self) -> bool {
    matches!(self, BookshelfError::Authentication(_))
  }

  /// The query attached to a [`BookshelfError::NotFound`], if any.
  pub fn query(&self) -> Option<&str> {
    match self {
      BookshelfError::NotFound { query } => Some(query),
      _ => None,
    }
  }
}
