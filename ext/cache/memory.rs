// Copyright 2018-2026 the Deno authors. MIT license.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::CacheHandle;
use crate::CacheStorage;
use crate::CacheStorageError;
use crate::CachedRequest;
use crate::CachedResponse;

type Entries = Arc<Mutex<Vec<(CachedRequest, CachedResponse)>>>;

/// Cache storage held entirely in memory. Caches keep their creation
/// order and entries keep their insertion order.
#[derive(Clone, Default)]
pub struct InMemoryCacheStorage {
  caches: Arc<Mutex<Vec<(String, Entries)>>>,
}

impl InMemoryCacheStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create an empty cache if one with this name doesn't exist yet.
  pub fn create(&self, cache_name: &str) -> Result<(), CacheStorageError> {
    self.entries_or_create(cache_name).map(|_| ())
  }

  /// Store a request/response pair. An existing entry with the same URL
  /// is replaced in place.
  pub fn put(
    &self,
    cache_name: &str,
    request: CachedRequest,
    response: CachedResponse,
  ) -> Result<(), CacheStorageError> {
    let entries = self.entries_or_create(cache_name)?;
    let mut entries = entries.lock();
    match entries.iter_mut().find(|(r, _)| r.url == request.url) {
      Some(slot) => *slot = (request, response),
      None => entries.push((request, response)),
    }
    Ok(())
  }

  fn entries_or_create(
    &self,
    cache_name: &str,
  ) -> Result<Entries, CacheStorageError> {
    if cache_name.is_empty() {
      return Err(CacheStorageError::EmptyName);
    }
    let mut caches = self.caches.lock();
    if let Some((_, entries)) = caches.iter().find(|(n, _)| n == cache_name) {
      return Ok(entries.clone());
    }
    let entries = Entries::default();
    caches.push((cache_name.to_string(), entries.clone()));
    Ok(entries)
  }
}

#[async_trait]
impl CacheStorage for InMemoryCacheStorage {
  async fn keys(&self) -> Result<Vec<String>, CacheStorageError> {
    Ok(self.caches.lock().iter().map(|(n, _)| n.clone()).collect())
  }

  async fn open(
    &self,
    cache_name: &str,
  ) -> Result<Box<dyn CacheHandle>, CacheStorageError> {
    let caches = self.caches.lock();
    let Some((name, entries)) = caches.iter().find(|(n, _)| n == cache_name)
    else {
      return Err(CacheStorageError::NotFound(cache_name.to_string()));
    };
    Ok(Box::new(InMemoryCache {
      name: name.clone(),
      entries: entries.clone(),
    }))
  }
}

struct InMemoryCache {
  name: String,
  entries: Entries,
}

#[async_trait]
impl CacheHandle for InMemoryCache {
  fn name(&self) -> &str {
    &self.name
  }

  async fn keys(&self) -> Result<Vec<CachedRequest>, CacheStorageError> {
    Ok(self.entries.lock().iter().map(|(r, _)| r.clone()).collect())
  }

  async fn r#match(
    &self,
    request: &CachedRequest,
  ) -> Result<Option<CachedResponse>, CacheStorageError> {
    Ok(
      self
        .entries
        .lock()
        .iter()
        .find(|(r, _)| r.url == request.url)
        .map(|(_, response)| response.clone()),
    )
  }
}

#[cfg(test)]
mod tests {
  use bytes::Bytes;

  use super::*;
  use crate::ResponseBody;

  fn response(body: &'static [u8]) -> CachedResponse {
    CachedResponse {
      status: 200,
      status_text: "OK".to_string(),
      headers: vec![("content-type".to_string(), "text/plain".to_string())],
      body: ResponseBody::Bytes(Bytes::from_static(body)),
    }
  }

  #[tokio::test]
  async fn keeps_cache_and_entry_order() {
    let storage = InMemoryCacheStorage::new();
    storage.create("b").unwrap();
    storage
      .put("a", CachedRequest::new("https://a.test/2"), response(b"2"))
      .unwrap();
    storage
      .put("a", CachedRequest::new("https://a.test/1"), response(b"1"))
      .unwrap();

    assert_eq!(storage.keys().await.unwrap(), vec!["b", "a"]);
    let cache = storage.open("a").await.unwrap();
    assert_eq!(cache.name(), "a");
    let urls = cache
      .keys()
      .await
      .unwrap()
      .into_iter()
      .map(|r| r.url)
      .collect::<Vec<_>>();
    assert_eq!(urls, vec!["https://a.test/2", "https://a.test/1"]);
  }

  #[tokio::test]
  async fn put_replaces_same_url() {
    let storage = InMemoryCacheStorage::new();
    let request = CachedRequest::new("https://a.test/x");
    storage.put("v1", request.clone(), response(b"old")).unwrap();
    storage.put("v1", request.clone(), response(b"newer")).unwrap();

    let cache = storage.open("v1").await.unwrap();
    assert_eq!(cache.keys().await.unwrap().len(), 1);
    let found = cache.r#match(&request).await.unwrap().unwrap();
    assert_eq!(found.read_body().await.unwrap(), Bytes::from("newer"));
  }

  #[tokio::test]
  async fn reading_body_leaves_stored_response_intact() {
    let storage = InMemoryCacheStorage::new();
    let request = CachedRequest::new("https://a.test/x");
    storage.put("v1", request.clone(), response(b"hello")).unwrap();

    let cache = storage.open("v1").await.unwrap();
    let first = cache.r#match(&request).await.unwrap().unwrap();
    assert_eq!(first.read_body().await.unwrap().len(), 5);
    assert_eq!(first.read_body().await.unwrap().len(), 5);
    let second = cache.r#match(&request).await.unwrap().unwrap();
    assert_eq!(second.read_body().await.unwrap(), Bytes::from("hello"));
  }

  #[tokio::test]
  async fn open_unknown_and_empty_names() {
    let storage = InMemoryCacheStorage::new();
    assert!(matches!(
      storage.open("missing").await,
      Err(CacheStorageError::NotFound(name)) if name == "missing"
    ));
    assert!(matches!(
      storage.create(""),
      Err(CacheStorageError::EmptyName)
    ));
    assert!(storage.keys().await.unwrap().is_empty());
  }
}
