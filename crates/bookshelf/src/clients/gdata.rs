//! Client implementation for the GData Books feeds.
//!
//! Sign-in goes through the ClientLogin endpoint, which answers with a plain-text body of
//! `key=value` lines; the `Auth` value is the session token. Searches read the Atom volume
//! feed, either the public one or a user collection, and inserts post an Atom entry to the
//! collection feed. Every request after sign-in carries an
//! `Authorization: GoogleLogin auth=<token>` header.
//!
//! # Examples
//!
//! ```no_run
//! use bookshelf::{clients::GdataClient, CatalogService, SearchQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GdataClient::new()?;
//! let session = client.authenticate("reader@example.com", "hunter2").await?;
//!
//! let query = SearchQuery::fuzzy("Dune", "Frank Herbert");
//! for volume in client.search(&session, &query, None, 1).await? {
//!   println!("{} {:?}", volume.volume_id, volume.titles);
//! }
//! # Ok(())
//! # }
//! ```

use quick_xml::{escape::escape, events::Event, Reader};
use reqwest::{
  header::{AUTHORIZATION, CONTENT_TYPE},
  StatusCode,
};
use url::{form_urlencoded, Url};

use super::*;

/// ClientLogin endpoint.
pub const CLIENT_LOGIN_URL: &str = "https://www.google.com/accounts/ClientLogin";

/// Service name the Books feeds are authorized under.
const AUTH_SERVICE_NAME: &str = "print";

/// Protocol version requested on every feed call.
const GDATA_VERSION: &str = "2";

/// Request timeout for every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the GData Books feeds.
#[derive(Debug, Clone)]
pub struct GdataClient {
  /// Shared HTTP client, one connection pool for every call
  client:    reqwest::Client,
  /// Root of the Books feeds, without a trailing slash
  feeds_url: String,
  /// ClientLogin endpoint
  login_url: String,
}

impl GdataClient {
  /// Creates a client for the public Books feeds.
  pub fn new() -> Result<Self, BookshelfError> {
    Self::with_base_urls(DEFAULT_FEEDS_URL, CLIENT_LOGIN_URL)
  }

  /// Creates a client for alternate feed and sign-in endpoints.
  pub fn with_base_urls(
    feeds_url: impl Into<String>,
    login_url: impl Into<String>,
  ) -> Result<Self, BookshelfError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .timeout(REQUEST_TIMEOUT)
      .build()?;

    Ok(Self {
      client,
      feeds_url: feeds_url.into().trim_end_matches('/').to_string(),
      login_url: login_url.into(),
    })
  }

  /// URL of the feed a search runs against, with the query attached.
  fn search_url(
    &self,
    query: &SearchQuery,
    collection_id: Option<&str>,
    max_results: usize,
  ) -> Result<Url, BookshelfError> {
    let feed = match collection_id {
      Some(collection_id) => collection_uri(&self.feeds_url, collection_id),
      None => format!("{}/volumes", self.feeds_url),
    };

    let mut url = Url::parse(&feed)?;
    url.set_query(Some(&format!("q={}&max-results={}", encode_query(query), max_results)));
    Ok(url)
  }
}

/// Percent-encodes each term and joins them with `+`. A `+` inside a term goes out as `%2B`.
fn encode_query(query: &SearchQuery) -> String {
  query
    .terms()
    .iter()
    .map(|term| form_urlencoded::byte_serialize(term.as_bytes()).collect::<String>())
    .collect::<Vec<_>>()
    .join("+")
}

/// Value of the `Authorization` header for an authenticated call.
fn authorization(session: &Session) -> String { format!("GoogleLogin auth={}", session.token()) }

/// Pulls the `Auth` token out of a ClientLogin response body.
fn parse_auth_token(body: &str) -> Option<&str> {
  body.lines().find_map(|line| line.trim().strip_prefix("Auth=")).filter(|token| !token.is_empty())
}

/// Pulls the `Error` code out of a failed ClientLogin response body.
fn parse_login_error(body: &str) -> Option<&str> {
  body.lines().find_map(|line| line.trim().strip_prefix("Error="))
}

/// The volume identifier is the last path segment of an entry's Atom `<id>`.
fn volume_id_from_entry_id(entry_id: &str) -> String {
  entry_id.trim().trim_end_matches('/').rsplit('/').next().unwrap_or_default().to_string()
}

/// Elements of a volume entry that end up in a [`VolumeRecord`].
#[derive(Debug, Clone, Copy)]
enum EntryField {
  /// Atom `<id>`
  Id,
  /// Dublin Core `<dc:title>`
  Title,
  /// Dublin Core `<dc:creator>`
  Creator,
}

impl EntryField {
  /// Stores the element's text on the record.
  fn fill(self, record: &mut VolumeRecord, value: String) {
    match self {
      EntryField::Id => record.volume_id = volume_id_from_entry_id(&value),
      EntryField::Title => record.titles.push(value),
      EntryField::Creator => record.authors.push(value),
    }
  }
}

/// Parses a GData volume feed into records, in feed order.
fn parse_volume_feed(xml: &str) -> Result<Vec<VolumeRecord>, BookshelfError> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut records = Vec::new();
  let mut entry: Option<VolumeRecord> = None;
  let mut field: Option<EntryField> = None;

  loop {
    match reader.read_event()? {
      Event::Start(start) => {
        field = match start.name().as_ref() {
          b"entry" => {
            entry = Some(VolumeRecord::default());
            None
          },
          b"id" if entry.is_some() => Some(EntryField::Id),
          b"dc:title" if entry.is_some() => Some(EntryField::Title),
          b"dc:creator" if entry.is_some() => Some(EntryField::Creator),
          _ => None,
        };
      },
      Event::Text(text) => {
        if let (Some(record), Some(field)) = (entry.as_mut(), field) {
          field.fill(record, text.unescape()?.into_owned());
        }
      },
      Event::CData(cdata) => {
        if let (Some(record), Some(field)) = (entry.as_mut(), field) {
          field.fill(record, String::from_utf8_lossy(&cdata.into_inner()).into_owned());
        }
      },
      Event::End(end) => {
        if end.name().as_ref() == b"entry" {
          if let Some(record) = entry.take() {
            trace!("Parsed volume entry: {:?}", record);
            records.push(record);
          }
        }
        field = None;
      },
      Event::Eof => break,
      _ => {},
    }
  }

  Ok(records)
}

/// Atom entry posted to a collection feed to add a volume.
fn volume_entry_xml(volume_id: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?><entry xmlns="http://www.w3.org/2005/Atom"><id>{}</id></entry>"#,
    escape(volume_id)
  )
}

/// Reads the body, turning a non-success status into [`BookshelfError::ApiError`].
async fn ensure_success(
  action: &str,
  response: reqwest::Response,
) -> Result<String, BookshelfError> {
  let status = response.status();
  let text = response.text().await?;
  debug!("{action} response status: {status}");

  if status.is_success() {
    Ok(text)
  } else {
    Err(BookshelfError::ApiError(format!("{action} failed with {status}: {}", text.trim())))
  }
}

#[async_trait]
impl CatalogService for GdataClient {
  async fn authenticate(&self, username: &str, password: &str) -> Result<Session, BookshelfError> {
    debug!("Signing in to {} as {username}", self.login_url);

    let params = [
      ("accountType", "HOSTED_OR_GOOGLE"),
      ("Email", username),
      ("Passwd", password),
      ("service", AUTH_SERVICE_NAME),
      ("source", concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"))),
    ];

    let response = self.client.post(&self.login_url).form(&params).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status == StatusCode::FORBIDDEN {
      let reason = parse_login_error(&body).unwrap_or("credentials rejected");
      return Err(BookshelfError::Authentication(reason.to_string()));
    }
    if !status.is_success() {
      return Err(BookshelfError::Authentication(format!("sign-in returned {status}")));
    }

    parse_auth_token(&body).map(Session::new).ok_or_else(|| {
      BookshelfError::Authentication("sign-in response carried no Auth token".into())
    })
  }

  async fn search(
    &self,
    session: &Session,
    query: &SearchQuery,
    collection_id: Option<&str>,
    max_results: usize,
  ) -> Result<Vec<VolumeRecord>, BookshelfError> {
    let url = self.search_url(query, collection_id, max_results)?;
    debug!("Searching volumes via: {url}");

    let response = self
      .client
      .get(url)
      .header(AUTHORIZATION, authorization(session))
      .header("GData-Version", GDATA_VERSION)
      .send()
      .await?;
    let text = ensure_success("Volume search", response).await?;
    trace!("Volume feed: {text}");

    let mut records = parse_volume_feed(&text)?;
    records.truncate(max_results);
    Ok(records)
  }

  async fn insert_into_collection(
    &self,
    session: &Session,
    volume_id: &str,
    collection_id: &str,
  ) -> Result<(), BookshelfError> {
    let url = collection_uri(&self.feeds_url, collection_id);
    debug!("Inserting volume {volume_id} via: {url}");

    let response = self
      .client
      .post(&url)
      .header(AUTHORIZATION, authorization(session))
      .header("GData-Version", GDATA_VERSION)
      .header(CONTENT_TYPE, "application/atom+xml")
      .body(volume_entry_xml(volume_id))
      .send()
      .await?;
    ensure_success("Collection insert", response).await?;
    Ok(())
  }
}
