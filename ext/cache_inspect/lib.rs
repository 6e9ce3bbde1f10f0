// Copyright 2018-2026 the Deno authors. MIT license.

//! Lists the Cache Storage entries that belong to the active target's
//! origin and hands them to a presenter over a one-shot message channel.

mod channel;
mod entry;
mod enumerate;
mod export;
mod format;
mod inject;
mod presenter;
mod target;

pub use cache_accessor_storage::CacheStorageError;
pub use channel::BackgroundService;
pub use channel::CacheRequest;
pub use channel::CacheResponse;
pub use channel::ChannelError;
pub use channel::ErrorInfo;
pub use channel::MessageReceiver;
pub use channel::MessageSender;
pub use channel::Responder;
pub use channel::message_channel;
pub use entry::AggregateResult;
pub use entry::CacheEntry;
pub use entry::CacheGroup;
pub use entry::EnumerateOptions;
pub use entry::MatchMode;
pub use entry::OutputShape;
pub use enumerate::DirectContext;
pub use enumerate::Enumerator;
pub use enumerate::ExecutionContext;
pub use enumerate::enumerate_storage;
pub use export::ExportDocument;
pub use export::export_file_name;
pub use format::format_size;
pub use format::truncate_url;
pub use inject::InjectedContext;
pub use inject::InjectedFunction;
pub use inject::Injection;
pub use inject::InjectionResult;
pub use inject::InjectionTarget;
pub use inject::LocalDispatcher;
pub use inject::ScriptDispatcher;
pub use presenter::DataSource;
pub use presenter::ExportError;
pub use presenter::ExportSink;
pub use presenter::LoadError;
pub use presenter::LoadOutcome;
pub use presenter::LoadedView;
pub use presenter::PendingLoad;
pub use presenter::Presenter;
pub use presenter::Renderer;
pub use presenter::View;
pub use target::ActiveTarget;
pub use target::ActiveTargetLookup;
pub use target::StaticTarget;
pub use target::TargetId;
pub use target::origin_of;

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum EnumerationError {
  #[class(generic)]
  #[error("No active tab found")]
  NoActiveTarget,
  #[class(type)]
  #[error("Invalid target URL '{url}': {reason}")]
  InvalidTargetUrl { url: String, reason: String },
  #[class(inherit)]
  #[error(transparent)]
  StoreAccess(#[from] CacheStorageError),
  #[class(inherit)]
  #[error(transparent)]
  Dispatch(#[from] DispatchError),
}

#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum DispatchError {
  #[class(generic)]
  #[error("No tab with id: {0}")]
  UnknownTarget(TargetId),
  #[class(generic)]
  #[error("Script injection failed: {0}")]
  Failed(String),
  #[class(generic)]
  #[error("Script injection returned no result")]
  NoResult,
  #[class(type)]
  #[error("Invalid script injection arguments")]
  InvalidArguments(#[source] serde_json::Error),
  #[class(type)]
  #[error("Invalid script injection result")]
  InvalidResult(#[source] serde_json::Error),
}

/// A single entry that could not be read. Never fatal: the entry is
/// left out of the result.
#[derive(Debug, thiserror::Error, deno_error::JsError)]
#[class(inherit)]
#[error("Error processing cache item {url} in '{cache_name}'")]
pub struct EntryReadError {
  pub url: String,
  pub cache_name: String,
  #[source]
  #[inherit]
  pub source: CacheStorageError,
}
