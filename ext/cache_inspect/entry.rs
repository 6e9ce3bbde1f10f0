// Copyright 2018-2026 the Deno authors. MIT license.

use cache_accessor_storage::CachedResponse;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

/// One stored request/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
  pub url: String,
  pub content_type: String,
  pub size: u64,
  pub status: u16,
  pub status_text: String,
  pub last_modified: Option<String>,
  pub expires: Option<String>,
  pub cache_control: Option<String>,
  pub cache_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub headers: Option<IndexMap<String, String>>,
}

impl CacheEntry {
  pub fn from_response(
    cache_name: &str,
    url: &str,
    response: &CachedResponse,
    size: u64,
    include_headers: bool,
  ) -> Self {
    let header = |name: &str| response.header(name).map(ToString::to_string);
    Self {
      url: url.to_string(),
      content_type: header("content-type")
        .unwrap_or_else(|| "unknown".to_string()),
      size,
      status: response.status,
      status_text: response.status_text.clone(),
      last_modified: header("last-modified"),
      expires: header("expires"),
      cache_control: header("cache-control"),
      cache_name: cache_name.to_string(),
      headers: include_headers.then(|| merge_headers(&response.headers)),
    }
  }
}

/// Lowercases header names and joins the values of repeated names with
/// `", "`.
fn merge_headers(headers: &[(String, String)]) -> IndexMap<String, String> {
  let mut merged = IndexMap::<String, String>::new();
  for (name, value) in headers {
    merged
      .entry(name.to_ascii_lowercase())
      .and_modify(|existing| {
        existing.push_str(", ");
        existing.push_str(value);
      })
      .or_insert_with(|| value.clone());
  }
  merged
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGroup {
  pub name: String,
  pub entries: Vec<CacheEntry>,
}

/// Result of one enumeration: either every entry in store order, or the
/// entries grouped by the cache they were found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateResult {
  Flat(Vec<CacheEntry>),
  Grouped(Vec<CacheGroup>),
}

impl Default for AggregateResult {
  fn default() -> Self {
    Self::Flat(Vec::new())
  }
}

impl AggregateResult {
  pub fn empty(shape: OutputShape) -> Self {
    match shape {
      OutputShape::Flat => Self::Flat(Vec::new()),
      OutputShape::Grouped => Self::Grouped(Vec::new()),
    }
  }

  pub fn entries(&self) -> Box<dyn Iterator<Item = &CacheEntry> + '_> {
    match self {
      Self::Flat(entries) => Box::new(entries.iter()),
      Self::Grouped(groups) => {
        Box::new(groups.iter().flat_map(|group| group.entries.iter()))
      }
    }
  }

  /// Number of entries, across all groups.
  pub fn len(&self) -> usize {
    match self {
      Self::Flat(entries) => entries.len(),
      Self::Grouped(groups) => groups.iter().map(|g| g.entries.len()).sum(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn total_size(&self) -> u64 {
    self.entries().map(|entry| entry.size).sum()
  }
}

#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
  /// The request URL's own origin must equal the queried origin.
  #[default]
  Origin,
  /// The request URL merely contains the queried origin. Loose: an origin
  /// that shows up in a query string also matches.
  Substring,
}

impl MatchMode {
  pub fn matches(&self, url: &str, origin: &str) -> bool {
    match self {
      Self::Origin => match Url::parse(url) {
        Ok(url) => {
          let url_origin = url.origin();
          url_origin.is_tuple() && url_origin.ascii_serialization() == origin
        }
        Err(_) => false,
      },
      Self::Substring => url.contains(origin),
    }
  }
}

#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OutputShape {
  #[default]
  Flat,
  Grouped,
}

#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct EnumerateOptions {
  pub match_mode: MatchMode,
  pub shape: OutputShape,
  pub include_headers: bool,
}
