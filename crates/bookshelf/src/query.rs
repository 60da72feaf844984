//! Search query construction for the catalog.
//!
//! Two kinds of query are built here:
//! - A *fuzzy* query, made from free-text title and author strings that may carry edition
//!   notes, punctuation or volume markers. The text is cleaned up and every remaining word
//!   becomes an `intitle:` or `inauthor:` term.
//! - An *exact* query, made from the verbatim titles and authors of a record the catalog
//!   already returned. Each value is quoted whole so near-duplicate titles are told apart.
//!
//! Terms are joined with `+`, the way words are joined in a URL query. The terms are also
//! kept apart, since a quoted value may itself contain `+`.
//!
//! # Examples
//!
//! ```
//! use bookshelf::{SearchQuery, VolumeRecord};
//!
//! let fuzzy = SearchQuery::fuzzy("The Hobbit (Unabridged), Part 2", "J.R.R. Tolkien");
//! assert_eq!(fuzzy.as_str(), "intitle:The+intitle:Hobbit+inauthor:JRR+inauthor:Tolkien");
//!
//! let dune = VolumeRecord::new("B1hSG45JCX4C", vec!["Dune".into()], vec!["Frank Herbert".into()]);
//! assert_eq!(SearchQuery::exact(&dune).as_str(), r#"intitle:"Dune"+inauthor:"Frank Herbert""#);
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use super::*;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref PARENTHESIZED: Regex = Regex::new(r"[(][^)]+[)]").unwrap();

    // Characters outside these sets change the meaning of the remote query syntax.
    static ref TITLE_DISALLOWED: Regex = Regex::new(r"[^A-Za-z0-9\-='$@ ]").unwrap();
    static ref AUTHOR_DISALLOWED: Regex = Regex::new(r"[^A-Za-z0-9\-' ]").unwrap();

    static ref VOLUME_MARKER: Regex = Regex::new(r"(?i)(Part|Volume) [0-9]+").unwrap();
}

/// Prefix for title terms.
const TITLE_PREFIX: &str = "intitle:";
/// Prefix for author terms.
const AUTHOR_PREFIX: &str = "inauthor:";
/// Separator between terms.
const TERM_SEPARATOR: &str = "+";

/// A query string ready to hand to the catalog.
///
/// Queries are immutable once built. Equal queries hash equally, which is what the browser
/// relies on to remember shelf lookups it has already confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
  /// Individual `intitle:`/`inauthor:` terms, in order
  terms: Vec<String>,
  /// The terms joined with `+`
  text:  String,
}

impl SearchQuery {
  /// Builds a fuzzy query from free-text title and author strings.
  ///
  /// The title goes through [`normalize_title`] and the author through
  /// [`normalize_author`]. Each word of the result becomes a term, titles first.
  pub fn fuzzy(title: &str, author: &str) -> Self {
    let title = normalize_title(title);
    let author = normalize_author(author);

    let terms = title
      .split_whitespace()
      .map(|word| format!("{TITLE_PREFIX}{word}"))
      .chain(author.split_whitespace().map(|word| format!("{AUTHOR_PREFIX}{word}")))
      .collect();

    Self::from_terms(terms)
  }

  /// Builds an exact query from a record's verbatim titles and authors.
  ///
  /// No characters are filtered: the values came from the catalog itself.
  pub fn exact(record: &VolumeRecord) -> Self {
    let terms = record
      .titles
      .iter()
      .map(|title| format!("{TITLE_PREFIX}\"{title}\""))
      .chain(record.authors.iter().map(|author| format!("{AUTHOR_PREFIX}\"{author}\"")))
      .collect();

    Self::from_terms(terms)
  }

  /// Joins terms into a query.
  fn from_terms(terms: Vec<String>) -> Self {
    let text = terms.join(TERM_SEPARATOR);
    Self { terms, text }
  }

  /// The query text.
  pub fn as_str(&self) -> &str { &self.text }

  /// The separate terms. Unlike splitting [`as_str`](Self::as_str) on `+`, this keeps a `+`
  /// inside a quoted value as part of its term.
  pub fn terms(&self) -> &[String] { &self.terms }

  /// True when no terms survived normalization.
  pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

impl fmt::Display for SearchQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.text) }
}

impl AsRef<str> for SearchQuery {
  fn as_ref(&self) -> &str { &self.text }
}

impl From<SearchQuery> for String {
  fn from(query: SearchQuery) -> Self { query.text }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
fn collapse_whitespace(text: &str) -> String {
  WHITESPACE.replace_all(text.trim(), " ").trim().to_string()
}

/// Cleans a free-text title for use in a fuzzy query.
///
/// In order:
/// 1. Collapse whitespace
/// 2. Drop parenthesized notes such as `(Unabridged)`
/// 3. Drop every character other than ASCII letters, digits, `-`, `'`, `=`, `$`, `@` and space
/// 4. Drop volume markers like `Part 2` or `volume 11`
///
/// Whitespace is collapsed again after each step. Volume markers are removed until none are
/// left, so running the function on its own output changes nothing.
///
/// ```
/// use bookshelf::query::normalize_title;
///
/// assert_eq!(normalize_title("  The   Hobbit (Unabridged), Part 2 "), "The Hobbit");
/// assert_eq!(normalize_title("Les Misérables: Volume 3"), "Les Misrables");
/// ```
pub fn normalize_title(title: &str) -> String {
  let title = collapse_whitespace(title);
  let title = collapse_whitespace(&PARENTHESIZED.replace_all(&title, ""));
  let mut title = collapse_whitespace(&TITLE_DISALLOWED.replace_all(&title, ""));

  while VOLUME_MARKER.is_match(&title) {
    title = collapse_whitespace(&VOLUME_MARKER.replace_all(&title, ""));
  }

  title
}

/// Cleans a free-text author name for use in a fuzzy query.
///
/// Keeps ASCII letters, digits, `-`, `'` and spaces. Names carry no edition notes, so unlike
/// [`normalize_title`] nothing else is stripped.
///
/// ```
/// use bookshelf::query::normalize_author;
///
/// assert_eq!(normalize_author("J.R.R.  Tolkien"), "JRR Tolkien");
/// assert_eq!(normalize_author("Flannery O'Connor"), "Flannery O'Connor");
/// ```
pub fn normalize_author(author: &str) -> String {
  let author = collapse_whitespace(author);
  collapse_whitespace(&AUTHOR_DISALLOWED.replace_all(&author, ""))
}
