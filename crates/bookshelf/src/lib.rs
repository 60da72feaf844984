//! A library for finding catalog records from noisy title/author pairs and keeping a
//! remote bookshelf (a user-owned collection of catalog records) in sync.
//!
//! The heavy lifting of authentication, transport and feed parsing is done by a
//! [`CatalogService`] implementation. [`CatalogBrowser`] sits on top of it and adds query
//! normalization, a request throttle and per-session de-duplication of membership checks
//! and inserts.
//!
//! # Example
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use bookshelf::{clients::GdataClient, CatalogBrowser};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let mut browser =
//!     CatalogBrowser::new(GdataClient::new()?, "reader@example.com", "hunter2", Duration::from_secs(1));
//!
//!   let volume = browser.find_best_match("The Hobbit (Unabridged)", "J.R.R. Tolkien").await?;
//!   if !browser.is_on_bookshelf("4", &volume).await? {
//!     browser.add_to_bookshelf("4", &volume.volume_id).await?;
//!   }
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{collections::HashSet, fmt, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
#[cfg(test)] use tracing_test::traced_test;

pub mod browser;
pub mod clients;
pub mod config;
pub mod errors;
pub mod query;
pub mod throttle;
pub mod volume;
#[cfg(test)] mod tests;

pub use browser::CatalogBrowser;
pub use clients::CatalogService;
pub use config::{BrowserConfig, Credentials};
pub use errors::BookshelfError;
pub use query::SearchQuery;
pub use throttle::Throttle;
pub use volume::{Session, VolumeRecord};

/// Root of the GData Books feeds.
pub const DEFAULT_FEEDS_URL: &str = "http://books.google.com/books/feeds";

/// Builds the URI addressing a user's collection.
///
/// Collections live at `<feeds>/users/me/collections/<collection_id>/volumes`. Any transport
/// talking to the remote service must address collections this way.
///
/// # Examples
///
/// ```
/// use bookshelf::{collection_uri, DEFAULT_FEEDS_URL};
///
/// assert_eq!(
///   collection_uri(DEFAULT_FEEDS_URL, "1001"),
///   "http://books.google.com/books/feeds/users/me/collections/1001/volumes"
/// );
/// ```
pub fn collection_uri(feeds_url: &str, collection_id: &str) -> String {
  format!("{}/users/me/collections/{}/volumes", feeds_url.trim_end_matches('/'), collection_id)
}
