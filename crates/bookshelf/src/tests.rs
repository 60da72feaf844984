use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
  },
};

use tokio::time::Instant;

use super::*;

/// In-memory catalog that counts every call made to it.
#[derive(Default)]
struct MockCatalog {
  /// Records returned for searches outside a collection, best match first
  catalog:        Vec<VolumeRecord>,
  /// Shelf contents keyed by collection id
  shelves:        Mutex<HashMap<String, Vec<VolumeRecord>>>,
  /// Password the mock accepts
  password:       String,
  /// Fail every insert with an API error
  fail_inserts:   bool,
  /// Number of `authenticate` calls
  auth_calls:     AtomicUsize,
  /// Number of `search` calls
  search_calls:   AtomicUsize,
  /// Number of `insert_into_collection` calls
  insert_calls:   AtomicUsize,
  /// Issued queries with their collection and issue time
  issued_queries: Mutex<Vec<(String, Option<String>, Instant)>>,
}

impl MockCatalog {
  fn new(catalog: Vec<VolumeRecord>) -> Self {
    Self { catalog, password: "hunter2".into(), ..Default::default() }
  }

  fn shelve(&self, collection_id: &str, record: VolumeRecord) {
    self.shelves.lock().unwrap().entry(collection_id.to_string()).or_default().push(record);
  }

  fn auth_calls(&self) -> usize { self.auth_calls.load(Ordering::SeqCst) }

  fn search_calls(&self) -> usize { self.search_calls.load(Ordering::SeqCst) }

  fn insert_calls(&self) -> usize { self.insert_calls.load(Ordering::SeqCst) }

  fn issued_queries(&self) -> Vec<(String, Option<String>, Instant)> {
    self.issued_queries.lock().unwrap().clone()
  }
}

#[async_trait]
impl CatalogService for MockCatalog {
  async fn authenticate(&self, _username: &str, password: &str) -> Result<Session, BookshelfError> {
    self.auth_calls.fetch_add(1, Ordering::SeqCst);
    if password == self.password {
      Ok(Session::new("token-1"))
    } else {
      Err(BookshelfError::Authentication("BadAuthentication".into()))
    }
  }

  async fn search(
    &self,
    session: &Session,
    query: &SearchQuery,
    collection_id: Option<&str>,
    max_results: usize,
  ) -> Result<Vec<VolumeRecord>, BookshelfError> {
    assert_eq!(session.token(), "token-1");
    self.search_calls.fetch_add(1, Ordering::SeqCst);
    self.issued_queries.lock().unwrap().push((
      query.to_string(),
      collection_id.map(str::to_string),
      Instant::now(),
    ));

    let mut records: Vec<VolumeRecord> = match collection_id {
      Some(collection_id) => self
        .shelves
        .lock()
        .unwrap()
        .get(collection_id)
        .map(|shelf| shelf.iter().filter(|r| &SearchQuery::exact(r) == query).cloned().collect())
        .unwrap_or_default(),
      None => self.catalog.clone(),
    };
    records.truncate(max_results);
    Ok(records)
  }

  async fn insert_into_collection(
    &self,
    session: &Session,
    volume_id: &str,
    collection_id: &str,
  ) -> Result<(), BookshelfError> {
    assert_eq!(session.token(), "token-1");
    self.insert_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_inserts {
      return Err(BookshelfError::ApiError("Collection insert failed with 500".into()));
    }

    let record = self
      .catalog
      .iter()
      .find(|r| r.volume_id == volume_id)
      .cloned()
      .unwrap_or_else(|| VolumeRecord::new(volume_id, vec![], vec![]));
    self.shelve(collection_id, record);
    Ok(())
  }
}

/// Catalog transport that fails every call at the network level.
struct UnreachableCatalog;

#[async_trait]
impl CatalogService for UnreachableCatalog {
  async fn authenticate(&self, _: &str, _: &str) -> Result<Session, BookshelfError> {
    Err(BookshelfError::ApiError("connection refused".into()))
  }

  async fn search(
    &self,
    _: &Session,
    _: &SearchQuery,
    _: Option<&str>,
    _: usize,
  ) -> Result<Vec<VolumeRecord>, BookshelfError> {
    unreachable!("search without a session")
  }

  async fn insert_into_collection(&self, _: &Session, _: &str, _: &str) -> Result<(), BookshelfError> {
    unreachable!("insert without a session")
  }
}

fn dune() -> VolumeRecord {
  VolumeRecord::new("B1hSG45JCX4C", vec!["Dune".into()], vec!["Frank Herbert".into()])
}

fn dune_messiah() -> VolumeRecord {
  VolumeRecord::new("6VHTdzWPcOMC", vec!["Dune Messiah".into()], vec!["Frank Herbert".into()])
}

fn browser(catalog: MockCatalog) -> CatalogBrowser<MockCatalog> {
  CatalogBrowser::new(catalog, "reader@example.com", "hunter2", Duration::from_secs(1))
}

#[traced_test]
#[tokio::test]
async fn test_sign_in_is_idempotent() -> anyhow::Result<()> {
  let mut browser = browser(MockCatalog::new(vec![]));
  assert!(!browser.is_signed_in());

  browser.sign_in().await?;
  browser.sign_in().await?;

  assert!(browser.is_signed_in());
  assert_eq!(browser.service().auth_calls(), 1);
  assert!(logs_contain("Signed in as reader@example.com"));
  assert!(!logs_contain("hunter2"));
  Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_leave_browser_signed_out() {
  let mut browser =
    CatalogBrowser::new(MockCatalog::new(vec![]), "reader@example.com", "wrong", Duration::ZERO);

  let err = browser.sign_in().await.unwrap_err();
  assert!(err.is_authentication_error());
  assert!(!browser.is_signed_in());

  // every operation retries the sign-in and fails the same way
  let err = browser.find_best_match("Dune", "Frank Herbert").await.unwrap_err();
  assert!(err.is_authentication_error());
  assert_eq!(browser.service().auth_calls(), 2);
  assert_eq!(browser.service().search_calls(), 0);
}

#[tokio::test]
async fn test_transport_failure_during_sign_in_is_authentication_error() {
  let mut browser = CatalogBrowser::new(UnreachableCatalog, "reader", "pw", Duration::ZERO);

  let err = browser.add_to_bookshelf("1001", "B1hSG45JCX4C").await.unwrap_err();
  assert!(matches!(err, BookshelfError::Authentication(ref msg) if msg.contains("connection refused")));
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_find_best_match_returns_first_result() -> anyhow::Result<()> {
  let mut browser = browser(MockCatalog::new(vec![dune(), dune_messiah()]));

  let volume = browser.find_best_match("Dune (Unabridged), Part 1", "Frank  Herbert").await?;

  assert_eq!(volume, dune());
  assert_eq!(browser.service().auth_calls(), 1);
  let issued = browser.service().issued_queries();
  assert_eq!(issued.len(), 1);
  assert_eq!(issued[0].0, "intitle:Dune+inauthor:Frank+inauthor:Herbert");
  assert_eq!(issued[0].1, None);
  Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_find_best_match_not_found_carries_query() {
  let mut browser = browser(MockCatalog::new(vec![]));

  let err = browser.find_best_match("The Hobbit (Unabridged), Part 2", "J.R.R. Tolkien").await.unwrap_err();

  assert!(err.is_not_found());
  assert_eq!(err.query(), Some("intitle:The+intitle:Hobbit+inauthor:JRR+inauthor:Tolkien"));
  assert!(err.to_string().contains("intitle:The+intitle:Hobbit"));
}

#[tokio::test]
async fn test_find_best_match_rejects_empty_query() {
  let mut browser = browser(MockCatalog::new(vec![dune()]));

  let err = browser.find_best_match("(Audiobook)", "!!!").await.unwrap_err();

  assert!(matches!(err, BookshelfError::InvalidUsage(_)));
  assert_eq!(browser.service().search_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_searches_are_spaced_by_min_delay() -> anyhow::Result<()> {
  let catalog = MockCatalog::new(vec![dune()]);
  catalog.shelve("1001", dune());
  let mut browser =
    CatalogBrowser::new(catalog, "reader@example.com", "hunter2", Duration::from_secs(3));

  browser.find_best_match("Dune", "Frank Herbert").await?;
  browser.find_best_match("Dune", "Frank Herbert").await?;
  browser.is_on_bookshelf("1001", &dune()).await?;

  let issued = browser.service().issued_queries();
  assert_eq!(issued.len(), 3);
  for pair in issued.windows(2) {
    assert!(pair[1].2 - pair[0].2 >= Duration::from_secs(3));
  }
  assert_eq!(browser.min_delay(), Duration::from_secs(3));
  Ok(())
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_on_bookshelf_is_remembered() -> anyhow::Result<()> {
  let catalog = MockCatalog::new(vec![dune()]);
  catalog.shelve("1001", dune());
  let mut browser = browser(catalog);

  assert!(browser.is_on_bookshelf("1001", &dune()).await?);
  assert!(browser.is_on_bookshelf("1001", &dune()).await?);

  assert_eq!(browser.service().search_calls(), 1);
  let issued = browser.service().issued_queries();
  assert_eq!(issued[0].0, r#"intitle:"Dune"+inauthor:"Frank Herbert""#);
  assert_eq!(issued[0].1.as_deref(), Some("1001"));
  assert!(logs_contain("Already confirmed on shelf 1001"));
  Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_not_on_bookshelf_is_checked_every_time() -> anyhow::Result<()> {
  let mut browser = browser(MockCatalog::new(vec![dune()]));

  assert!(!browser.is_on_bookshelf("1001", &dune()).await?);
  assert!(!browser.is_on_bookshelf("1001", &dune()).await?);
  assert_eq!(browser.service().search_calls(), 2);

  // shelved by someone else in the meantime
  browser.service().shelve("1001", dune());
  assert!(browser.is_on_bookshelf("1001", &dune()).await?);
  assert_eq!(browser.service().search_calls(), 3);
  Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_exact_lookup_tells_similar_titles_apart() -> anyhow::Result<()> {
  let catalog = MockCatalog::new(vec![]);
  catalog.shelve("1001", dune_messiah());
  let mut browser = browser(catalog);

  assert!(!browser.is_on_bookshelf("1001", &dune()).await?);
  assert!(browser.is_on_bookshelf("1001", &dune_messiah()).await?);
  Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_does_not_leak_across_shelves() -> anyhow::Result<()> {
  let catalog = MockCatalog::new(vec![]);
  catalog.shelve("1001", dune());
  let mut browser = browser(catalog);

  assert!(browser.is_on_bookshelf("1001", &dune()).await?);
  assert!(!browser.is_on_bookshelf("2002", &dune()).await?);
  assert_eq!(browser.service().search_calls(), 2);
  Ok(())
}

#[tokio::test]
async fn test_is_on_bookshelf_rejects_bad_input() {
  let mut browser = browser(MockCatalog::new(vec![]));

  let err = browser.is_on_bookshelf("", &dune()).await.unwrap_err();
  assert!(matches!(err, BookshelfError::InvalidUsage(_)));

  let err = browser.is_on_bookshelf("1001", &VolumeRecord::default()).await.unwrap_err();
  assert!(matches!(err, BookshelfError::InvalidUsage(_)));
  assert_eq!(browser.service().search_calls(), 0);
}

#[traced_test]
#[tokio::test]
async fn test_add_to_bookshelf_inserts_once() -> anyhow::Result<()> {
  let mut browser = browser(MockCatalog::new(vec![dune()]));

  browser.add_to_bookshelf("1001", "B1hSG45JCX4C").await?;
  browser.add_to_bookshelf("1001", "B1hSG45JCX4C").await?;

  assert_eq!(browser.service().insert_calls(), 1);
  assert_eq!(browser.service().auth_calls(), 1);
  assert!(logs_contain("Added volume B1hSG45JCX4C to shelf 1001"));

  // a different shelf or volume is a different pair
  browser.add_to_bookshelf("2002", "B1hSG45JCX4C").await?;
  browser.add_to_bookshelf("1001", "6VHTdzWPcOMC").await?;
  assert_eq!(browser.service().insert_calls(), 3);
  Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_added_volume_is_then_found_on_shelf() -> anyhow::Result<()> {
  let mut browser = browser(MockCatalog::new(vec![dune()]));

  let volume = browser.find_best_match("Dune", "Frank Herbert").await?;
  assert!(!browser.is_on_bookshelf("1001", &volume).await?);
  browser.add_to_bookshelf("1001", &volume.volume_id).await?;
  assert!(browser.is_on_bookshelf("1001", &volume).await?);
  Ok(())
}

#[tokio::test]
async fn test_failed_insert_is_not_remembered() {
  let catalog = MockCatalog { fail_inserts: true, ..MockCatalog::new(vec![dune()]) };
  let mut browser = browser(catalog);

  assert!(browser.add_to_bookshelf("1001", "B1hSG45JCX4C").await.is_err());
  assert!(browser.add_to_bookshelf("1001", "B1hSG45JCX4C").await.is_err());
  assert_eq!(browser.service().insert_calls(), 2);
}

#[tokio::test]
async fn test_add_to_bookshelf_rejects_empty_ids() {
  let mut browser = browser(MockCatalog::new(vec![]));

  assert!(matches!(
    browser.add_to_bookshelf("1001", " ").await,
    Err(BookshelfError::InvalidUsage(_))
  ));
  assert!(matches!(
    browser.add_to_bookshelf("", "B1hSG45JCX4C").await,
    Err(BookshelfError::InvalidUsage(_))
  ));
  assert_eq!(browser.service().insert_calls(), 0);
}

#[tokio::test]
async fn test_browsers_do_not_share_state() -> anyhow::Result<()> {
  let mut first = browser(MockCatalog::new(vec![]));
  let mut second = browser(MockCatalog::new(vec![]));

  first.add_to_bookshelf("1001", "B1hSG45JCX4C").await?;
  second.add_to_bookshelf("1001", "B1hSG45JCX4C").await?;

  assert_eq!(first.service().insert_calls(), 1);
  assert_eq!(second.service().insert_calls(), 1);
  Ok(())
}

#[test]
fn test_from_config() {
  let config = BrowserConfig::new("reader@example.com", "hunter2").with_min_delay_secs(5);
  let browser = CatalogBrowser::from_config(MockCatalog::new(vec![]), config);

  assert_eq!(browser.username(), "reader@example.com");
  assert_eq!(browser.min_delay(), Duration::from_secs(5));
  assert!(!browser.is_signed_in());
  assert!(!format!("{browser:?}").contains("hunter2"));
}
