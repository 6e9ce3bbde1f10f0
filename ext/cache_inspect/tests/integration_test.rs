// Copyright 2018-2026 the Deno authors. MIT license.

use std::sync::Arc;

use bytes::Bytes;
use cache_accessor_inspect::ActiveTarget;
use cache_accessor_inspect::AggregateResult;
use cache_accessor_inspect::BackgroundService;
use cache_accessor_inspect::CacheRequest;
use cache_accessor_inspect::DataSource;
use cache_accessor_inspect::EnumerateOptions;
use cache_accessor_inspect::Enumerator;
use cache_accessor_inspect::ExportDocument;
use cache_accessor_inspect::ExportSink;
use cache_accessor_inspect::InjectedContext;
use cache_accessor_inspect::LocalDispatcher;
use cache_accessor_inspect::OutputShape;
use cache_accessor_inspect::Presenter;
use cache_accessor_inspect::Renderer;
use cache_accessor_inspect::StaticTarget;
use cache_accessor_inspect::View;
use cache_accessor_storage::CachedRequest;
use cache_accessor_storage::CachedResponse;
use cache_accessor_storage::InMemoryCacheStorage;
use cache_accessor_storage::ResponseBody;
use pretty_assertions::assert_eq;

struct NoopRenderer;

impl Renderer for NoopRenderer {
  fn render(&mut self, _view: &View) {}
}

struct NoopSink;

impl ExportSink for NoopSink {
  fn save(&mut self, _document: &ExportDocument) -> Result<(), std::io::Error> {
    Ok(())
  }
}

fn example_storage() -> Arc<InMemoryCacheStorage> {
  let storage = InMemoryCacheStorage::new();
  storage
    .put(
      "v1",
      CachedRequest::new("https://example.com/app.js"),
      CachedResponse {
        status: 200,
        status_text: "OK".to_string(),
        headers: vec![(
          "content-type".to_string(),
          "text/javascript".to_string(),
        )],
        body: ResponseBody::Bytes(Bytes::from(vec![7u8; 42])),
      },
    )
    .unwrap();
  Arc::new(storage)
}

fn example_target() -> Arc<StaticTarget> {
  Arc::new(StaticTarget::new(ActiveTarget::new(
    9,
    "https://example.com/index.html",
  )))
}

fn assert_single_app_js(result: &AggregateResult) {
  let entries = result.entries().collect::<Vec<_>>();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].url, "https://example.com/app.js");
  assert_eq!(entries[0].size, 42);
  assert_eq!(entries[0].content_type, "text/javascript");
  assert_eq!(entries[0].cache_name, "v1");
}

#[tokio::test]
async fn direct_context_end_to_end() {
  let (messenger, _handle) = BackgroundService::new(Enumerator::direct(
    example_storage(),
    EnumerateOptions::default(),
  ))
  .spawn();

  let response = messenger
    .send_message(CacheRequest::GetCaches {
      origin: "https://example.com".to_string(),
    })
    .await
    .unwrap();
  assert_single_app_js(&response.into_result().unwrap());

  let mut presenter = Presenter::new(
    DataSource::Caches,
    messenger,
    example_target(),
    Box::new(NoopRenderer),
    Box::new(NoopSink),
  );
  presenter.load().await;
  let View::Loaded(view) = presenter.view() else {
    panic!("expected loaded view, got {:?}", presenter.view());
  };
  assert_single_app_js(view.result());
}

#[tokio::test]
async fn injected_context_end_to_end() {
  let dispatcher = LocalDispatcher::new();
  dispatcher.attach(9, example_storage());
  let context = InjectedContext::new(Arc::new(dispatcher), example_target());
  let options = EnumerateOptions {
    shape: OutputShape::Grouped,
    ..Default::default()
  };
  let (messenger, _handle) =
    BackgroundService::new(Enumerator::new(Arc::new(context), options))
      .spawn();

  let mut presenter = Presenter::new(
    DataSource::StorageData,
    messenger,
    example_target(),
    Box::new(NoopRenderer),
    Box::new(NoopSink),
  );
  presenter.load().await;
  let View::Loaded(view) = presenter.view() else {
    panic!("expected loaded view, got {:?}", presenter.view());
  };
  let AggregateResult::Grouped(groups) = view.result() else {
    panic!("expected grouped result");
  };
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].name, "v1");
  assert_single_app_js(view.result());

  let document = presenter.export().await.unwrap();
  assert!(document.file_name.starts_with("storage-"));
  assert!(document.file_name.ends_with("Z.json"));
}

#[tokio::test]
async fn zero_stores_render_empty_state() {
  let (messenger, _handle) = BackgroundService::new(Enumerator::direct(
    Arc::new(InMemoryCacheStorage::new()),
    EnumerateOptions::default(),
  ))
  .spawn();
  let mut presenter = Presenter::new(
    DataSource::Caches,
    messenger,
    example_target(),
    Box::new(NoopRenderer),
    Box::new(NoopSink),
  );
  presenter.load().await;
  assert_eq!(presenter.view(), &View::Empty);
}

#[tokio::test]
async fn failed_target_lookup_renders_error() {
  let (messenger, _handle) = BackgroundService::new(Enumerator::direct(
    example_storage(),
    EnumerateOptions::default(),
  ))
  .spawn();
  let mut presenter = Presenter::new(
    DataSource::Caches,
    messenger,
    Arc::new(StaticTarget::none()),
    Box::new(NoopRenderer),
    Box::new(NoopSink),
  );
  presenter.load().await;
  assert!(matches!(presenter.view(), View::Error(_)));

  // retrying is safe and lands in the same state
  presenter.refresh().await;
  assert!(matches!(presenter.view(), View::Error(_)));
}

#[tokio::test]
async fn injected_failure_reaches_presenter() {
  // the page isn't attached, so the injection can't reach it
  let context =
    InjectedContext::new(Arc::new(LocalDispatcher::new()), example_target());
  let (messenger, _handle) = BackgroundService::new(Enumerator::new(
    Arc::new(context),
    EnumerateOptions::default(),
  ))
  .spawn();
  let mut presenter = Presenter::new(
    DataSource::Caches,
    messenger,
    example_target(),
    Box::new(NoopRenderer),
    Box::new(NoopSink),
  );
  presenter.load().await;
  assert_eq!(
    presenter.view(),
    &View::Error("Failed to load caches: No tab with id: 9".to_string())
  );
}
