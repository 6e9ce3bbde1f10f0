// Copyright 2018-2026 the Deno authors. MIT license.

use std::sync::Arc;

use async_trait::async_trait;
use cache_accessor_storage::CacheHandle;
use cache_accessor_storage::CacheStorage;
use cache_accessor_storage::CacheStorageError;
use cache_accessor_storage::CachedRequest;

use crate::AggregateResult;
use crate::CacheEntry;
use crate::CacheGroup;
use crate::EntryReadError;
use crate::EnumerateOptions;
use crate::EnumerationError;
use crate::OutputShape;

/// Where the enumeration routine runs. The cache storage that matters may
/// live in a different context than the caller.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
  async fn enumerate(
    &self,
    origin: &str,
    options: &EnumerateOptions,
  ) -> Result<AggregateResult, EnumerationError>;
}

/// Runs the routine against a storage the caller can reach directly.
#[derive(Clone)]
pub struct DirectContext {
  storage: Arc<dyn CacheStorage>,
}

impl DirectContext {
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self { storage }
  }
}

#[async_trait]
impl ExecutionContext for DirectContext {
  async fn enumerate(
    &self,
    origin: &str,
    options: &EnumerateOptions,
  ) -> Result<AggregateResult, EnumerationError> {
    enumerate_storage(self.storage.as_ref(), origin, options).await
  }
}

#[derive(Clone)]
pub struct Enumerator {
  context: Arc<dyn ExecutionContext>,
  options: EnumerateOptions,
}

impl Enumerator {
  pub fn new(
    context: Arc<dyn ExecutionContext>,
    options: EnumerateOptions,
  ) -> Self {
    Self { context, options }
  }

  pub fn direct(
    storage: Arc<dyn CacheStorage>,
    options: EnumerateOptions,
  ) -> Self {
    Self::new(Arc::new(DirectContext::new(storage)), options)
  }

  pub fn options(&self) -> &EnumerateOptions {
    &self.options
  }

  pub async fn enumerate(
    &self,
    origin: &str,
  ) -> Result<AggregateResult, EnumerationError> {
    self
      .context
      .enumerate(origin, &self.options)
      .await
      .inspect_err(|err| {
        log::error!("Failed to get caches for {}: {}", origin, err)
      })
  }
}

/// Collects every entry of `storage` whose URL matches `origin`.
///
/// Entries that can't be read are logged and skipped; any other storage
/// failure aborts the enumeration.
pub async fn enumerate_storage(
  storage: &dyn CacheStorage,
  origin: &str,
  options: &EnumerateOptions,
) -> Result<AggregateResult, EnumerationError> {
  let cache_names = storage.keys().await?;
  let mut groups = Vec::with_capacity(cache_names.len());
  for cache_name in cache_names {
    log::debug!("Processing cache: {}", cache_name);
    let cache = storage.open(&cache_name).await?;
    let mut entries = Vec::new();
    for request in cache.keys().await? {
      if !options.match_mode.matches(&request.url, origin) {
        continue;
      }
      match read_entry(cache.as_ref(), &request, options.include_headers)
        .await
      {
        Ok(Some(entry)) => entries.push(entry),
        Ok(None) => {}
        Err(err) => log::warn!("{}: {}", err, err.source),
      }
    }
    groups.push(CacheGroup {
      name: cache_name,
      entries,
    });
  }

  let result = match options.shape {
    OutputShape::Flat => AggregateResult::Flat(
      groups.into_iter().flat_map(|group| group.entries).collect(),
    ),
    OutputShape::Grouped => AggregateResult::Grouped(
      groups
        .into_iter()
        .filter(|group| !group.entries.is_empty())
        .collect(),
    ),
  };
  log::debug!("Found {} cache items for {}", result.len(), origin);
  Ok(result)
}

async fn read_entry(
  cache: &dyn CacheHandle,
  request: &CachedRequest,
  include_headers: bool,
) -> Result<Option<CacheEntry>, EntryReadError> {
  let to_err = |source: CacheStorageError| EntryReadError {
    url: request.url.clone(),
    cache_name: cache.name().to_string(),
    source,
  };
  let Some(response) = cache.r#match(request).await.map_err(to_err)? else {
    return Ok(None);
  };
  let body = response.read_body().await.map_err(to_err)?;
  Ok(Some(CacheEntry::from_response(
    cache.name(),
    &request.url,
    &response,
    body.len() as u64,
    include_headers,
  )))
}

#[cfg(test)]
mod tests {
  use bytes::Bytes;
  use cache_accessor_storage::CachedResponse;
  use cache_accessor_storage::InMemoryCacheStorage;
  use cache_accessor_storage::ResponseBody;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::MatchMode;

  fn response(content_type: &str, body: &[u8]) -> CachedResponse {
    CachedResponse {
      status: 200,
      status_text: "OK".to_string(),
      headers: vec![("content-type".to_string(), content_type.to_string())],
      body: ResponseBody::Bytes(Bytes::copy_from_slice(body)),
    }
  }

  fn put(storage: &InMemoryCacheStorage, cache: &str, url: &str, len: usize) {
    storage
      .put(
        cache,
        CachedRequest::new(url),
        response("text/plain", &vec![b'a'; len]),
      )
      .unwrap();
  }

  fn urls(result: &AggregateResult) -> Vec<&str> {
    result.entries().map(|entry| entry.url.as_str()).collect()
  }

  fn mixed_storage() -> InMemoryCacheStorage {
    let storage = InMemoryCacheStorage::new();
    put(&storage, "v1", "https://example.com/a.js", 1);
    put(&storage, "v1", "https://other.test/b.js", 2);
    put(&storage, "v2", "https://other.test/?ref=https://example.com", 3);
    put(&storage, "v2", "https://example.com/c.css", 4);
    storage.create("v3").unwrap();
    storage
  }

  #[tokio::test]
  async fn origin_mode_returns_exact_origin_entries() {
    let storage = mixed_storage();
    let result = enumerate_storage(
      &storage,
      "https://example.com",
      &EnumerateOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(
      urls(&result),
      vec!["https://example.com/a.js", "https://example.com/c.css"]
    );
    assert!(matches!(result, AggregateResult::Flat(_)));
  }

  #[tokio::test]
  async fn substring_mode_keeps_loose_matches() {
    let storage = mixed_storage();
    let options = EnumerateOptions {
      match_mode: MatchMode::Substring,
      ..Default::default()
    };
    let result = enumerate_storage(&storage, "https://example.com", &options)
      .await
      .unwrap();
    assert_eq!(
      urls(&result),
      vec![
        "https://example.com/a.js",
        "https://other.test/?ref=https://example.com",
        "https://example.com/c.css",
      ]
    );
  }

  #[tokio::test]
  async fn grouped_shape_drops_empty_groups() {
    let storage = mixed_storage();
    put(&storage, "v4", "https://other.test/only", 1);
    let options = EnumerateOptions {
      shape: OutputShape::Grouped,
      ..Default::default()
    };
    let result = enumerate_storage(&storage, "https://example.com", &options)
      .await
      .unwrap();
    let AggregateResult::Grouped(groups) = result else {
      panic!("expected grouped result");
    };
    let names = groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["v1", "v2"]);
    assert!(groups.iter().all(|group| !group.entries.is_empty()));
    assert_eq!(groups[1].entries[0].cache_name, "v2");
  }

  #[tokio::test]
  async fn size_is_body_length() {
    let storage = InMemoryCacheStorage::new();
    storage
      .put(
        "v1",
        CachedRequest::new("https://example.com/app.js"),
        response("text/javascript", &[0; 42]),
      )
      .unwrap();
    let result = enumerate_storage(
      &storage,
      "https://example.com",
      &EnumerateOptions::default(),
    )
    .await
    .unwrap();
    let entries = result.entries().collect::<Vec<_>>();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].size, 42);
    assert_eq!(entries[0].content_type, "text/javascript");
    assert_eq!(entries[0].cache_name, "v1");

    // enumerating again sees the same bodies
    let again = enumerate_storage(
      &storage,
      "https://example.com",
      &EnumerateOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(again, result);
  }

  #[tokio::test]
  async fn unreadable_entry_is_skipped() {
    let storage = InMemoryCacheStorage::new();
    put(&storage, "v1", "https://example.com/ok", 5);
    storage
      .put(
        "v1",
        CachedRequest::new("https://example.com/broken"),
        CachedResponse {
          status: 200,
          status_text: "OK".to_string(),
          headers: Vec::new(),
          body: ResponseBody::File("/definitely/missing/body".into()),
        },
      )
      .unwrap();
    let result = enumerate_storage(
      &storage,
      "https://example.com",
      &EnumerateOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(urls(&result), vec!["https://example.com/ok"]);
  }

  #[tokio::test]
  async fn no_caches_is_empty() {
    let storage = InMemoryCacheStorage::new();
    let enumerator =
      Enumerator::direct(Arc::new(storage), EnumerateOptions::default());
    let result = enumerator.enumerate("https://example.com").await.unwrap();
    assert!(result.is_empty());
  }

  struct FailingStorage;

  #[async_trait]
  impl CacheStorage for FailingStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheStorageError> {
      Ok(vec!["v1".to_string()])
    }

    async fn open(
      &self,
      cache_name: &str,
    ) -> Result<Box<dyn CacheHandle>, CacheStorageError> {
      Err(CacheStorageError::NotFound(cache_name.to_string()))
    }
  }

  #[tokio::test]
  async fn store_failure_propagates() {
    let enumerator =
      Enumerator::direct(Arc::new(FailingStorage), EnumerateOptions::default());
    let err = enumerator.enumerate("https://example.com").await.unwrap_err();
    assert!(matches!(
      err,
      EnumerationError::StoreAccess(CacheStorageError::NotFound(_))
    ));
  }
}
