// Copyright 2018-2026 the Deno authors. MIT license.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cache_accessor_storage::CacheStorage;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ActiveTargetLookup;
use crate::AggregateResult;
use crate::DispatchError;
use crate::EnumerateOptions;
use crate::EnumerationError;
use crate::ExecutionContext;
use crate::TargetId;
use crate::enumerate_storage;

/// Functions that can be injected into a target. Only their names cross
/// the boundary; arguments and results travel as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectedFunction {
  /// Args: `[origin, options?]`. Result: an `AggregateResult`.
  EnumerateCaches,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionTarget {
  pub tab_id: TargetId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injection {
  pub target: InjectionTarget,
  pub func: InjectedFunction,
  pub args: Vec<Value>,
}

/// Result of running an injection in one frame of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionResult {
  pub frame_id: u32,
  pub result: Option<Value>,
}

#[async_trait]
pub trait ScriptDispatcher: Send + Sync {
  async fn execute(
    &self,
    injection: Injection,
  ) -> Result<Vec<InjectionResult>, DispatchError>;
}

/// Runs the routine inside the active target, against the cache storage
/// that target sees.
#[derive(Clone)]
pub struct InjectedContext {
  dispatcher: Arc<dyn ScriptDispatcher>,
  targets: Arc<dyn ActiveTargetLookup>,
}

impl InjectedContext {
  pub fn new(
    dispatcher: Arc<dyn ScriptDispatcher>,
    targets: Arc<dyn ActiveTargetLookup>,
  ) -> Self {
    Self {
      dispatcher,
      targets,
    }
  }
}

#[async_trait]
impl ExecutionContext for InjectedContext {
  async fn enumerate(
    &self,
    origin: &str,
    options: &EnumerateOptions,
  ) -> Result<AggregateResult, EnumerationError> {
    let target = self.targets.active_target().await?;
    let shape = options.shape;
    let options =
      serde_json::to_value(options).map_err(DispatchError::InvalidArguments)?;
    let injection = Injection {
      target: InjectionTarget { tab_id: target.id },
      func: InjectedFunction::EnumerateCaches,
      args: vec![Value::String(origin.to_string()), options],
    };
    log::debug!("Injecting cache enumeration into tab {}", target.id);
    let results = self.dispatcher.execute(injection).await?;
    let value = results
      .into_iter()
      .next()
      .and_then(|result| result.result)
      .filter(|value| !value.is_null())
      .ok_or(DispatchError::NoResult)?;
    let result: AggregateResult = serde_json::from_value(value)
      .map_err(DispatchError::InvalidResult)?;
    // an empty list carries no shape on the wire
    if result.is_empty() {
      return Ok(AggregateResult::empty(shape));
    }
    Ok(result)
  }
}

/// An in-process dispatcher: every attached target owns a cache storage,
/// and injected functions run against it on the other side of a JSON
/// boundary.
#[derive(Clone, Default)]
pub struct LocalDispatcher {
  targets: Arc<Mutex<HashMap<TargetId, Arc<dyn CacheStorage>>>>,
}

impl LocalDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn attach(&self, target: TargetId, storage: Arc<dyn CacheStorage>) {
    self.targets.lock().insert(target, storage);
  }
}

#[async_trait]
impl ScriptDispatcher for LocalDispatcher {
  async fn execute(
    &self,
    injection: Injection,
  ) -> Result<Vec<InjectionResult>, DispatchError> {
    let tab_id = injection.target.tab_id;
    let storage = self
      .targets
      .lock()
      .get(&tab_id)
      .cloned()
      .ok_or(DispatchError::UnknownTarget(tab_id))?;
    let result = match injection.func {
      InjectedFunction::EnumerateCaches => {
        run_enumerate_caches(storage.as_ref(), injection.args).await?
      }
    };
    Ok(vec![InjectionResult {
      frame_id: 0,
      result: Some(result),
    }])
  }
}

async fn run_enumerate_caches(
  storage: &dyn CacheStorage,
  args: Vec<Value>,
) -> Result<Value, DispatchError> {
  let mut args = args.into_iter();
  let origin: String = serde_json::from_value(args.next().unwrap_or_default())
    .map_err(DispatchError::InvalidArguments)?;
  let options: EnumerateOptions = match args.next() {
    Some(value) => {
      serde_json::from_value(value).map_err(DispatchError::InvalidArguments)?
    }
    None => EnumerateOptions::default(),
  };
  let result = enumerate_storage(storage, &origin, &options)
    .await
    .map_err(|err| DispatchError::Failed(err.to_string()))?;
  serde_json::to_value(result).map_err(DispatchError::InvalidResult)
}
