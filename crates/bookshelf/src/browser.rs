//! The catalog browser: lookups and bookshelf membership on top of a [`CatalogService`].
//!
//! A [`CatalogBrowser`] signs in lazily on first use, spaces out its searches with a
//! [`Throttle`], and remembers two things for as long as it lives:
//! - exact lookups already confirmed on a shelf, so repeated checks skip the network
//! - `(collection, volume)` pairs it already inserted, so repeated inserts are skipped
//!
//! Nothing is shared between browsers and nothing is persisted.
//!
//! # Examples
//!
//! ```no_run
//! use bookshelf::{clients::GdataClient, BrowserConfig, CatalogBrowser};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut browser = CatalogBrowser::from_config(GdataClient::new()?, BrowserConfig::from_env()?);
//!
//! let volume = browser.find_best_match("Dune (40th Anniversary Edition)", "Frank Herbert").await?;
//! if !browser.is_on_bookshelf("1001", &volume).await? {
//!   browser.add_to_bookshelf("1001", &volume.volume_id).await?;
//! }
//! # Ok(())
//! # }
//! ```

use super::*;

/// Whether the browser holds a session.
#[derive(Debug, Clone)]
enum SessionState {
  /// No session yet, or the last sign-in failed
  Unauthenticated,
  /// Signed in with the given session
  Authenticated(Session),
}

impl SessionState {
  /// The session, when signed in.
  fn session(&self) -> Option<&Session> {
    match self {
      SessionState::Authenticated(session) => Some(session),
      SessionState::Unauthenticated => None,
    }
  }
}

/// Finds catalog records and manages bookshelf membership for one account.
///
/// All operations take `&mut self`: a browser serves one caller at a time. Use one browser
/// per account and session.
pub struct CatalogBrowser<S> {
  /// The remote catalog
  service:           S,
  /// Credentials exchanged for a session on first use
  credentials:       Credentials,
  /// Current session, if signed in
  state:             SessionState,
  /// Spacing between catalog searches
  throttle:          Throttle,
  /// `(collection_id, exact query)` lookups already found on a shelf
  confirmed_shelved: HashSet<(String, SearchQuery)>,
  /// `(collection_id, volume_id)` pairs already inserted
  inserted:          HashSet<(String, String)>,
}

impl<S: CatalogService> CatalogBrowser<S> {
  /// Creates a signed-out browser.
  ///
  /// `min_delay` is the minimum time between two catalog searches and cannot be changed
  /// afterwards.
  pub fn new(
    service: S,
    username: impl Into<String>,
    password: impl Into<String>,
    min_delay: Duration,
  ) -> Self {
    Self {
      service,
      credentials: Credentials::new(username, password),
      state: SessionState::Unauthenticated,
      throttle: Throttle::new(min_delay),
      confirmed_shelved: HashSet::new(),
      inserted: HashSet::new(),
    }
  }

  /// Creates a signed-out browser from a [`BrowserConfig`].
  pub fn from_config(service: S, config: BrowserConfig) -> Self {
    let min_delay = config.min_delay();
    let BrowserConfig { credentials, .. } = config;
    Self::new(service, credentials.username, credentials.password, min_delay)
  }

  /// The account username.
  pub fn username(&self) -> &str { &self.credentials.username }

  /// The minimum time between two catalog searches.
  pub fn min_delay(&self) -> Duration { self.throttle.min_delay() }

  /// Whether a session is currently held.
  pub fn is_signed_in(&self) -> bool { self.state.session().is_some() }

  /// The underlying catalog service.
  pub fn service(&self) -> &S { &self.service }

  /// Signs in unless already signed in.
  ///
  /// Every other operation calls this first, so calling it directly is only needed to
  /// surface credential problems early.
  ///
  /// # Errors
  ///
  /// Returns [`BookshelfError::Authentication`] when the credentials are rejected or the
  /// exchange fails for any other reason. The browser stays signed out.
  pub async fn sign_in(&mut self) -> Result<(), BookshelfError> {
    if self.is_signed_in() {
      trace!("Already signed in as {}", self.credentials.username);
      return Ok(());
    }

    debug!("Signing in as {}", self.credentials.username);
    let session = self
      .service
      .authenticate(&self.credentials.username, &self.credentials.password)
      .await
      .map_err(|e| match e {
        BookshelfError::Authentication(_) => e,
        other => BookshelfError::Authentication(other.to_string()),
      })?;

    info!("Signed in as {}", self.credentials.username);
    self.state = SessionState::Authenticated(session);
    Ok(())
  }

  /// Finds the catalog record that best matches a free-text title and author.
  ///
  /// The inputs are cleaned into a fuzzy query (see [`SearchQuery::fuzzy`]) and the
  /// catalog's first result is returned as-is.
  ///
  /// When cleanup leaves no terms at all, for instance a title that is only a parenthesized
  /// note, no search is sent. An empty query would match the whole catalog, so its first
  /// result would not be a match for anything the caller asked for.
  ///
  /// # Errors
  ///
  /// - [`BookshelfError::NotFound`] with the issued query when nothing matches
  /// - [`BookshelfError::InvalidUsage`] when nothing is left of title and author after
  ///   cleanup
  /// - anything raised by signing in or by the catalog
  pub async fn find_best_match(
    &mut self,
    title: &str,
    author: &str,
  ) -> Result<VolumeRecord, BookshelfError> {
    self.sign_in().await?;

    let query = SearchQuery::fuzzy(title, author);
    if query.is_empty() {
      return Err(BookshelfError::InvalidUsage(format!(
        "title {title:?} and author {author:?} leave no search terms"
      )));
    }

    self.first_match(&query, None).await
  }

  /// Checks whether a record is on a bookshelf.
  ///
  /// The shelf is searched with an exact query built from the record's titles and authors,
  /// so editions with similar titles are not confused. Once a record is seen on a shelf the
  /// answer is remembered and later checks return `true` without a request. A `false` is
  /// never remembered.
  ///
  /// # Errors
  ///
  /// - [`BookshelfError::InvalidUsage`] for an empty collection id or a record with neither
  ///   titles nor authors
  /// - anything raised by signing in or by the catalog, other than an empty result
  pub async fn is_on_bookshelf(
    &mut self,
    collection_id: &str,
    record: &VolumeRecord,
  ) -> Result<bool, BookshelfError> {
    require_id("collection id", collection_id)?;
    self.sign_in().await?;

    let query = SearchQuery::exact(record);
    if query.is_empty() {
      return Err(BookshelfError::InvalidUsage(format!(
        "volume {:?} has no titles or authors to look up",
        record.volume_id
      )));
    }

    let lookup = (collection_id.to_string(), query);
    if self.confirmed_shelved.contains(&lookup) {
      trace!("Already confirmed on shelf {collection_id}: {}", lookup.1);
      return Ok(true);
    }

    let query = &lookup.1;
    match self.first_match(query, Some(collection_id)).await {
      Ok(_) => {
        debug!("Found on shelf {collection_id}: {query}");
        self.confirmed_shelved.insert(lookup);
        Ok(true)
      },
      Err(e) if e.is_not_found() => {
        debug!("Not on shelf {collection_id}: {query}");
        Ok(false)
      },
      Err(e) => Err(e),
    }
  }

  /// Adds a volume to a bookshelf.
  ///
  /// Each `(collection_id, volume_id)` pair is sent at most once per browser; repeats return
  /// immediately. The remote shelf is not consulted, so use
  /// [`is_on_bookshelf`](Self::is_on_bookshelf) to avoid adding books already shelved by
  /// someone else.
  ///
  /// # Errors
  ///
  /// - [`BookshelfError::InvalidUsage`] for an empty collection or volume id
  /// - anything raised by signing in or by the catalog; the pair is then not remembered
  pub async fn add_to_bookshelf(
    &mut self,
    collection_id: &str,
    volume_id: &str,
  ) -> Result<(), BookshelfError> {
    require_id("collection id", collection_id)?;
    require_id("volume id", volume_id)?;
    self.sign_in().await?;

    let key = (collection_id.to_string(), volume_id.to_string());
    if self.inserted.contains(&key) {
      trace!("Volume {volume_id} already added to shelf {collection_id}");
      return Ok(());
    }

    let session = self.signed_in_session()?;
    self.service.insert_into_collection(session, volume_id, collection_id).await?;

    info!("Added volume {volume_id} to shelf {collection_id}");
    self.inserted.insert(key);
    Ok(())
  }

  /// Runs a throttled single-result search and returns its only record.
  async fn first_match(
    &mut self,
    query: &SearchQuery,
    collection_id: Option<&str>,
  ) -> Result<VolumeRecord, BookshelfError> {
    self.throttle.wait().await;

    debug!("Searching catalog with: {query}");
    let session = self.signed_in_session()?;
    let records = self.service.search(session, query, collection_id, 1).await?;

    records
      .into_iter()
      .next()
      .ok_or_else(|| BookshelfError::NotFound { query: query.to_string() })
  }

  /// The current session; callers sign in first.
  fn signed_in_session(&self) -> Result<&Session, BookshelfError> {
    self.state.session().ok_or_else(|| BookshelfError::Authentication("not signed in".into()))
  }
}

impl<S> fmt::Debug for CatalogBrowser<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CatalogBrowser")
      .field("credentials", &self.credentials)
      .field("signed_in", &self.state.session().is_some())
      .field("throttle", &self.throttle)
      .field("confirmed_shelved", &self.confirmed_shelved.len())
      .field("inserted", &self.inserted.len())
      .finish()
  }
}

/// Rejects empty identifiers.
fn require_id(what: &str, id: &str) -> Result<(), BookshelfError> {
  if id.trim().is_empty() {
    return Err(BookshelfError::InvalidUsage(format!("{what} must not be empty")));
  }
  Ok(())
}
