// Copyright 2018-2026 the Deno authors. MIT license.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::ActiveTargetLookup;
use crate::AggregateResult;
use crate::CacheEntry;
use crate::CacheRequest;
use crate::ChannelError;
use crate::EnumerationError;
use crate::ExportDocument;
use crate::MessageSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
  Loading,
  Empty,
  Error(String),
  Loaded(LoadedView),
}

/// A loaded result plus the current filter. Filtering only hides entries;
/// the result itself is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedView {
  result: AggregateResult,
  filter: String,
}

impl LoadedView {
  pub fn new(result: AggregateResult, filter: &str) -> Self {
    Self {
      result,
      filter: filter.to_lowercase(),
    }
  }

  pub fn result(&self) -> &AggregateResult {
    &self.result
  }

  pub fn filter(&self) -> &str {
    &self.filter
  }

  pub fn is_visible(&self, entry: &CacheEntry) -> bool {
    self.filter.is_empty() || entry.url.to_lowercase().contains(&self.filter)
  }

  pub fn visible_entries(&self) -> Vec<&CacheEntry> {
    self
      .result
      .entries()
      .filter(|entry| self.is_visible(entry))
      .collect()
  }

  pub fn item_count(&self) -> usize {
    self.result.len()
  }

  pub fn total_size(&self) -> u64 {
    self.result.total_size()
  }

  fn set_filter(&mut self, term: &str) {
    self.filter = term.to_lowercase();
  }
}

pub trait Renderer {
  fn render(&mut self, view: &View);
}

/// Receives exported documents, e.g. by saving them to disk.
pub trait ExportSink {
  fn save(&mut self, document: &ExportDocument) -> Result<(), std::io::Error>;
}

/// Which background action backs the presenter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
  #[default]
  Caches,
  StorageData,
}

impl DataSource {
  fn load_request(&self, origin: String) -> CacheRequest {
    match self {
      Self::Caches => CacheRequest::GetCaches { origin },
      Self::StorageData => CacheRequest::GetStorageData { origin },
    }
  }

  fn export_request(&self, origin: String) -> CacheRequest {
    match self {
      Self::Caches => CacheRequest::ExportCaches { origin },
      Self::StorageData => CacheRequest::GetStorageData { origin },
    }
  }

  pub fn file_prefix(&self) -> &'static str {
    match self {
      Self::Caches => "cache",
      Self::StorageData => "storage",
    }
  }
}

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum LoadError {
  #[class(inherit)]
  #[error(transparent)]
  Target(EnumerationError),
  #[class(generic)]
  #[error("{message}")]
  Remote { class: String, message: String },
  #[class(inherit)]
  #[error(transparent)]
  Channel(#[from] ChannelError),
}

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum ExportError {
  #[class(inherit)]
  #[error(transparent)]
  Load(#[from] LoadError),
  #[class(generic)]
  #[error(transparent)]
  Serialize(#[from] serde_json::Error),
  #[class(inherit)]
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

async fn fetch(
  messenger: &MessageSender,
  targets: &dyn ActiveTargetLookup,
  make_request: impl FnOnce(String) -> CacheRequest,
) -> Result<AggregateResult, LoadError> {
  let target = targets.active_target().await.map_err(LoadError::Target)?;
  log::debug!("Current tab URL: {}", target.url);
  let origin = target.origin().map_err(LoadError::Target)?;
  log::debug!("Requesting caches for origin: {}", origin);
  let response = messenger.send_message(make_request(origin)).await?;
  response
    .into_result()
    .map_err(|info| LoadError::Remote {
      class: info.class,
      message: info.message,
    })
}

/// A load that has been started but not applied. It owns everything it
/// needs, so it can run while the presenter keeps handling input.
pub struct PendingLoad {
  generation: u64,
  source: DataSource,
  messenger: MessageSender,
  targets: Arc<dyn ActiveTargetLookup>,
}

impl PendingLoad {
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub async fn run(self) -> LoadOutcome {
    let source = self.source;
    let result = fetch(&self.messenger, self.targets.as_ref(), |origin| {
      source.load_request(origin)
    })
    .await;
    LoadOutcome {
      generation: self.generation,
      result,
    }
  }
}

pub struct LoadOutcome {
  generation: u64,
  result: Result<AggregateResult, LoadError>,
}

impl LoadOutcome {
  pub fn generation(&self) -> u64 {
    self.generation
  }
}

pub struct Presenter {
  source: DataSource,
  messenger: MessageSender,
  targets: Arc<dyn ActiveTargetLookup>,
  renderer: Box<dyn Renderer>,
  sink: Box<dyn ExportSink>,
  view: View,
  snapshot: Option<AggregateResult>,
  filter: String,
  generation: u64,
}

impl Presenter {
  pub fn new(
    source: DataSource,
    messenger: MessageSender,
    targets: Arc<dyn ActiveTargetLookup>,
    renderer: Box<dyn Renderer>,
    sink: Box<dyn ExportSink>,
  ) -> Self {
    Self {
      source,
      messenger,
      targets,
      renderer,
      sink,
      view: View::Loading,
      snapshot: None,
      filter: String::new(),
      generation: 0,
    }
  }

  pub fn view(&self) -> &View {
    &self.view
  }

  /// Initial load.
  pub async fn load(&mut self) {
    let pending = self.start_load();
    let outcome = pending.run().await;
    self.finish_load(outcome);
  }

  pub async fn refresh(&mut self) {
    self.load().await
  }

  /// Show the loading view and hand out a load to run. Any load started
  /// earlier becomes stale.
  pub fn start_load(&mut self) -> PendingLoad {
    self.generation += 1;
    self.set_view(View::Loading);
    PendingLoad {
      generation: self.generation,
      source: self.source,
      messenger: self.messenger.clone(),
      targets: self.targets.clone(),
    }
  }

  /// Apply a finished load. Returns `false` if a newer load has been
  /// started since, in which case the outcome is dropped.
  pub fn finish_load(&mut self, outcome: LoadOutcome) -> bool {
    if outcome.generation != self.generation {
      log::debug!(
        "Discarding stale load {} (latest is {})",
        outcome.generation,
        self.generation
      );
      return false;
    }
    let view = match outcome.result {
      Ok(result) => {
        log::debug!("Received {} cache items", result.len());
        self.snapshot = Some(result.clone());
        if result.is_empty() {
          View::Empty
        } else {
          View::Loaded(LoadedView::new(result, &self.filter))
        }
      }
      Err(err) => {
        log::debug!("Failed to load caches: {}", err);
        self.snapshot = None;
        View::Error(format!("Failed to load caches: {}", err))
      }
    };
    self.set_view(view);
    true
  }

  /// Hide entries whose URL doesn't contain `term`, ignoring case. The term
  /// also applies to results loaded later.
  pub fn filter(&mut self, term: &str) {
    self.filter = term.to_string();
    if let View::Loaded(view) = &mut self.view {
      view.set_filter(term);
      self.renderer.render(&self.view);
    }
  }

  pub async fn export(&mut self) -> Result<ExportDocument, ExportError> {
    self.export_at(Utc::now()).await
  }

  /// Export the whole loaded result, ignoring the filter. Without a loaded
  /// result the data is requested from the background service instead.
  pub async fn export_at(
    &mut self,
    now: DateTime<Utc>,
  ) -> Result<ExportDocument, ExportError> {
    let result = self.try_export(now).await;
    if let Err(err) = &result {
      log::debug!("Export failed: {}", err);
      self.set_view(View::Error(format!("Export failed: {}", err)));
    }
    result
  }

  async fn try_export(
    &mut self,
    now: DateTime<Utc>,
  ) -> Result<ExportDocument, ExportError> {
    let data = match &self.snapshot {
      Some(snapshot) => snapshot.clone(),
      None => {
        let source = self.source;
        fetch(&self.messenger, self.targets.as_ref(), |origin| {
          source.export_request(origin)
        })
        .await?
      }
    };
    let document = ExportDocument::new(self.source.file_prefix(), now, &data)?;
    self.sink.save(&document)?;
    Ok(document)
  }

  fn set_view(&mut self, view: View) {
    self.view = view;
    self.renderer.render(&self.view);
  }
}
