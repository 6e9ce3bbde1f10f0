// Copyright 2018-2026 the Deno authors. MIT license.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::CacheHandle;
use crate::CacheStorage;
use crate::CacheStorageError;
use crate::CachedRequest;
use crate::CachedResponse;
use crate::ResponseBody;
use crate::deserialize_headers;

/// Read-only view over a cache storage directory written by Deno's
/// `deno_cache` extension: a `cache.db` index plus one body file per
/// response under `<cache_id>/responses/`.
#[derive(Clone)]
pub struct SqliteCacheStorage {
  connection: Arc<Mutex<Connection>>,
  cache_storage_dir: PathBuf,
}

impl SqliteCacheStorage {
  pub fn open(cache_storage_dir: PathBuf) -> Result<Self, CacheStorageError> {
    let path = cache_storage_dir.join("cache.db");
    if !path.is_file() {
      return Err(CacheStorageError::StorageNotFound(path));
    }
    let connection = Connection::open_with_flags(
      &path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    log::debug!("Opened cache storage at {}", path.display());
    Ok(Self {
      connection: Arc::new(Mutex::new(connection)),
      cache_storage_dir,
    })
  }

  pub fn cache_storage_dir(&self) -> &Path {
    &self.cache_storage_dir
  }
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
  async fn keys(&self) -> Result<Vec<String>, CacheStorageError> {
    let db = self.connection.clone();
    tokio::task::spawn_blocking(move || {
      let db = db.lock();
      let mut stmt =
        db.prepare("SELECT cache_name FROM cache_storage ORDER BY id")?;
      let names = stmt
        .query_map(params![], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
      Ok::<Vec<String>, CacheStorageError>(names)
    })
    .await?
  }

  async fn open(
    &self,
    cache_name: &str,
  ) -> Result<Box<dyn CacheHandle>, CacheStorageError> {
    if cache_name.is_empty() {
      return Err(CacheStorageError::EmptyName);
    }
    let db = self.connection.clone();
    let name = cache_name.to_string();
    let maybe_cache_id = tokio::task::spawn_blocking(move || {
      let db = db.lock();
      let cache_id = db
        .query_row(
          "SELECT id FROM cache_storage WHERE cache_name = ?1",
          params![name],
          |row| row.get::<_, i64>(0),
        )
        .optional()?;
      Ok::<Option<i64>, CacheStorageError>(cache_id)
    })
    .await??;
    let Some(cache_id) = maybe_cache_id else {
      return Err(CacheStorageError::NotFound(cache_name.to_string()));
    };
    Ok(Box::new(SqliteCache {
      name: cache_name.to_string(),
      cache_id,
      connection: self.connection.clone(),
      responses_dir: get_responses_dir(&self.cache_storage_dir, cache_id),
    }))
  }
}

fn get_responses_dir(cache_storage_dir: &Path, cache_id: i64) -> PathBuf {
  cache_storage_dir
    .join(cache_id.to_string())
    .join("responses")
}

struct SqliteCache {
  name: String,
  cache_id: i64,
  connection: Arc<Mutex<Connection>>,
  responses_dir: PathBuf,
}

#[async_trait]
impl CacheHandle for SqliteCache {
  fn name(&self) -> &str {
    &self.name
  }

  async fn keys(&self) -> Result<Vec<CachedRequest>, CacheStorageError> {
    let db = self.connection.clone();
    let cache_id = self.cache_id;
    let rows = tokio::task::spawn_blocking(move || {
      let db = db.lock();
      let mut stmt = db.prepare(
        "SELECT request_url, request_headers
             FROM request_response_list
             WHERE cache_id = ?1
             ORDER BY id",
      )?;
      let rows = stmt
        .query_map(params![cache_id], |row| {
          let request_url: String = row.get(0)?;
          let request_headers: Vec<u8> = row.get(1)?;
          Ok((request_url, request_headers))
        })?
        .collect::<Result<Vec<_>, _>>()?;
      Ok::<Vec<(String, Vec<u8>)>, CacheStorageError>(rows)
    })
    .await??;

    let requests = rows
      .into_iter()
      .map(|(url, headers)| {
        let headers = deserialize_headers(&headers).unwrap_or_else(|err| {
          log::warn!(
            "Ignoring request headers of {} in '{}': {}",
            url,
            self.name,
            err
          );
          Vec::new()
        });
        CachedRequest { url, headers }
      })
      .collect();
    Ok(requests)
  }

  async fn r#match(
    &self,
    request: &CachedRequest,
  ) -> Result<Option<CachedResponse>, CacheStorageError> {
    let db = self.connection.clone();
    let cache_id = self.cache_id;
    let request_url = request.url.clone();
    let maybe_row = tokio::task::spawn_blocking(move || {
      let db = db.lock();
      let row = db
        .query_row(
          "SELECT response_headers, response_status, response_status_text, response_body_key
               FROM request_response_list
               WHERE cache_id = ?1 AND request_url = ?2",
          (cache_id, &request_url),
          |row| {
            let response_headers: Vec<u8> = row.get(0)?;
            let response_status: u16 = row.get(1)?;
            let response_status_text: Option<String> = row.get(2)?;
            let response_body_key: Option<String> = row.get(3)?;
            Ok((
              response_headers,
              response_status,
              response_status_text,
              response_body_key,
            ))
          },
        )
        .optional()?;
      Ok::<_, CacheStorageError>(row)
    })
    .await??;

    let Some((headers, status, status_text, body_key)) = maybe_row else {
      return Ok(None);
    };
    let body = match body_key {
      Some(key) => ResponseBody::File(self.responses_dir.join(key)),
      None => ResponseBody::Empty,
    };
    Ok(Some(CachedResponse {
      status,
      status_text: status_text.unwrap_or_default(),
      headers: deserialize_headers(&headers)?,
      body,
    }))
  }
}
