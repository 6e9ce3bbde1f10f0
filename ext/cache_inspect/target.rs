// Copyright 2018-2026 the Deno authors. MIT license.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::EnumerationError;

pub type TargetId = u32;

/// The page whose caches are being inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTarget {
  pub id: TargetId,
  pub url: String,
}

impl ActiveTarget {
  pub fn new(id: TargetId, url: impl Into<String>) -> Self {
    Self {
      id,
      url: url.into(),
    }
  }

  pub fn origin(&self) -> Result<String, EnumerationError> {
    origin_of(&self.url)
  }
}

/// Scheme, host and port of `url`, serialized the way browsers do
/// (default ports are left out).
pub fn origin_of(url: &str) -> Result<String, EnumerationError> {
  let parsed =
    Url::parse(url).map_err(|err| EnumerationError::InvalidTargetUrl {
      url: url.to_string(),
      reason: err.to_string(),
    })?;
  let origin = parsed.origin();
  if !origin.is_tuple() {
    return Err(EnumerationError::InvalidTargetUrl {
      url: url.to_string(),
      reason: "opaque origin".to_string(),
    });
  }
  Ok(origin.ascii_serialization())
}

#[async_trait]
pub trait ActiveTargetLookup: Send + Sync {
  /// The currently active target, or `EnumerationError::NoActiveTarget`.
  async fn active_target(&self) -> Result<ActiveTarget, EnumerationError>;
}

/// A lookup that always answers with the same target.
#[derive(Debug, Clone, Default)]
pub struct StaticTarget(Option<ActiveTarget>);

impl StaticTarget {
  pub fn new(target: ActiveTarget) -> Self {
    Self(Some(target))
  }

  pub fn none() -> Self {
    Self(None)
  }
}

#[async_trait]
impl ActiveTargetLookup for StaticTarget {
  async fn active_target(&self) -> Result<ActiveTarget, EnumerationError> {
    self.0.clone().ok_or(EnumerationError::NoActiveTarget)
  }
}
