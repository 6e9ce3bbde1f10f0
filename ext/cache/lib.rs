// Copyright 2018-2026 the Deno authors. MIT license.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

mod memory;
mod sqlite;

pub use memory::InMemoryCacheStorage;
pub use sqlite::SqliteCacheStorage;

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum CacheStorageError {
  #[class(type)]
  #[error("Cache name cannot be empty")]
  EmptyName,
  #[class("NotFound")]
  #[error("Cache not found: {0}")]
  NotFound(String),
  #[class("NotFound")]
  #[error("Cache storage not found at {}", .0.display())]
  StorageNotFound(PathBuf),
  #[class(generic)]
  #[error("Malformed serialized headers")]
  MalformedHeaders,
  #[class(generic)]
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),
  #[class(generic)]
  #[error(transparent)]
  JoinError(#[from] tokio::task::JoinError),
  #[class(inherit)]
  #[error("Failed to read response body {}", .path.display())]
  BodyRead {
    path: PathBuf,
    #[source]
    #[inherit]
    source: std::io::Error,
  },
}

/// A request as recorded in a cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRequest {
  pub url: String,
  pub headers: Vec<(String, String)>,
}

impl CachedRequest {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      headers: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
  Empty,
  Bytes(Bytes),
  File(PathBuf),
}

/// A stored response. Reading the body borrows the response, so the
/// stored object stays intact and the body can be read again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub status: u16,
  pub status_text: String,
  pub headers: Vec<(String, String)>,
  pub body: ResponseBody,
}

impl CachedResponse {
  pub fn header(&self, name: &str) -> Option<&str> {
    get_header(name, &self.headers)
  }

  pub async fn read_body(&self) -> Result<Bytes, CacheStorageError> {
    match &self.body {
      ResponseBody::Empty => Ok(Bytes::new()),
      ResponseBody::Bytes(bytes) => Ok(bytes.clone()),
      ResponseBody::File(path) => {
        let data = tokio::fs::read(path).await.map_err(|source| {
          CacheStorageError::BodyRead {
            path: path.clone(),
            source,
          }
        })?;
        Ok(Bytes::from(data))
      }
    }
  }
}

/// The set of named caches visible in one execution context.
#[async_trait]
pub trait CacheStorage: Send + Sync {
  /// Names of all caches. Callers must not rely on the order.
  async fn keys(&self) -> Result<Vec<String>, CacheStorageError>;

  /// Open an existing cache. Unknown names are an error; this never
  /// creates a cache.
  async fn open(
    &self,
    cache_name: &str,
  ) -> Result<Box<dyn CacheHandle>, CacheStorageError>;
}

/// An opened cache store.
#[async_trait]
pub trait CacheHandle: Send + Sync {
  fn name(&self) -> &str;

  /// All stored requests, in insertion order.
  async fn keys(&self) -> Result<Vec<CachedRequest>, CacheStorageError>;

  async fn r#match(
    &self,
    request: &CachedRequest,
  ) -> Result<Option<CachedResponse>, CacheStorageError>;
}

/// Get value for the header with the given name.
pub fn get_header<'a>(
  name: &str,
  headers: &'a [(String, String)],
) -> Option<&'a str> {
  headers
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case(name))
    .map(|(_, v)| v.as_str())
}

#[test]
fn test_get_header() {
  let headers = vec![
    ("accept-encoding".to_string(), "gzip".to_string()),
    ("Content-Type".to_string(), "application/json".to_string()),
    ("vary".to_string(), "accept-encoding".to_string()),
  ];
  assert_eq!(get_header("accept-encoding", &headers), Some("gzip"));
  assert_eq!(
    get_header("content-type", &headers),
    Some("application/json")
  );
  assert_eq!(get_header("VARY", &headers), Some("accept-encoding"));
  assert_eq!(get_header("expires", &headers), None);
}

/// Serialize headers into bytes.
pub fn serialize_headers(headers: &[(String, String)]) -> Vec<u8> {
  let mut serialized_headers = Vec::new();
  for (name, value) in headers {
    serialized_headers.extend_from_slice(name.as_bytes());
    serialized_headers.extend_from_slice(b"\r\n");
    serialized_headers.extend_from_slice(value.as_bytes());
    serialized_headers.extend_from_slice(b"\r\n");
  }
  serialized_headers
}

/// Deserialize bytes into headers.
pub fn deserialize_headers(
  serialized_headers: &[u8],
) -> Result<Vec<(String, String)>, CacheStorageError> {
  let mut headers = Vec::new();
  let mut piece = None;
  let mut start = 0;
  for (i, byte) in serialized_headers.iter().enumerate() {
    if byte == &b'\r' && serialized_headers.get(i + 1) == Some(&b'\n') {
      match piece.take() {
        None => piece = Some(start..i),
        Some(name) => {
          headers.push((
            String::from_utf8_lossy(&serialized_headers[name]).into_owned(),
            String::from_utf8_lossy(&serialized_headers[start..i])
              .into_owned(),
          ));
        }
      }
      start = i + 2;
    }
  }
  if piece.is_some() || start != serialized_headers.len() {
    return Err(CacheStorageError::MalformedHeaders);
  }
  Ok(headers)
}

#[test]
fn test_serialize_deserialize_headers() {
  let headers = vec![
    ("content-type".to_string(), "text/javascript".to_string()),
    ("content-length".to_string(), "42".to_string()),
  ];
  let serialized = serialize_headers(&headers);
  assert_eq!(
    serialized,
    b"content-type\r\ntext/javascript\r\ncontent-length\r\n42\r\n"
  );
  assert_eq!(deserialize_headers(&serialized).unwrap(), headers);
  assert!(deserialize_headers(b"").unwrap().is_empty());
}

#[test]
fn test_deserialize_malformed_headers() {
  assert!(matches!(
    deserialize_headers(b"content-type\r\n"),
    Err(CacheStorageError::MalformedHeaders)
  ));
  assert!(matches!(
    deserialize_headers(b"content-type\r\ntext/plain"),
    Err(CacheStorageError::MalformedHeaders)
  ));
}
