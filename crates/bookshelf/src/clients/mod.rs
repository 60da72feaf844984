//! Catalog service clients.
//!
//! [`CatalogService`] is everything [`CatalogBrowser`] needs from the remote catalog:
//! sign in, search, and insert into a collection. Implementations own the wire protocol.
//!
//! # Supported Services
//!
//! - [`gdata`] - Client for the GData Books feeds with ClientLogin authentication
//!
//! # Examples
//!
//! ```no_run
//! use bookshelf::{clients::GdataClient, CatalogService, SearchQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GdataClient::new()?;
//! let session = client.authenticate("reader@example.com", "hunter2").await?;
//! let query = SearchQuery::fuzzy("Dune", "Frank Herbert");
//! let volumes = client.search(&session, &query, None, 1).await?;
//! # Ok(())
//! # }
//! ```

pub mod gdata;

pub use gdata::GdataClient;

use super::*;

/// The remote catalog as seen by [`CatalogBrowser`].
#[async_trait]
pub trait CatalogService: Send + Sync {
  /// Exchanges credentials for a session handle.
  ///
  /// Fails with [`BookshelfError::Authentication`] when the credentials are rejected.
  async fn authenticate(&self, username: &str, password: &str) -> Result<Session, BookshelfError>;

  /// Runs a search and returns at most `max_results` records, best match first.
  ///
  /// With a `collection_id` the search only covers that collection. An empty result is not
  /// an error here.
  async fn search(
    &self,
    session: &Session,
    query: &SearchQuery,
    collection_id: Option<&str>,
    max_results: usize,
  ) -> Result<Vec<VolumeRecord>, BookshelfError>;

  /// Adds a volume to a collection.
  async fn insert_into_collection(
    &self,
    session: &Session,
    volume_id: &str,
    collection_id: &str,
  ) -> Result<(), BookshelfError>;
}
