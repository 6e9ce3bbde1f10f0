// Copyright 2018-2026 the Deno authors. MIT license.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error as AnyError;
use cache_accessor_inspect::ActiveTarget;
use cache_accessor_inspect::AggregateResult;
use cache_accessor_inspect::BackgroundService;
use cache_accessor_inspect::CacheEntry;
use cache_accessor_inspect::DataSource;
use cache_accessor_inspect::EnumerateOptions;
use cache_accessor_inspect::Enumerator;
use cache_accessor_inspect::ExportDocument;
use cache_accessor_inspect::ExportSink;
use cache_accessor_inspect::InjectedContext;
use cache_accessor_inspect::LoadedView;
use cache_accessor_inspect::LocalDispatcher;
use cache_accessor_inspect::OutputShape;
use cache_accessor_inspect::Presenter;
use cache_accessor_inspect::Renderer;
use cache_accessor_inspect::StaticTarget;
use cache_accessor_inspect::TargetId;
use cache_accessor_inspect::View;
use cache_accessor_inspect::format_size;
use cache_accessor_inspect::truncate_url;
use cache_accessor_storage::CacheStorage;
use cache_accessor_storage::SqliteCacheStorage;

use crate::args::CACHE_DIR_ENV_VAR;
use crate::args::CacheAccessorSubcommand;
use crate::args::Flags;
use crate::args::resolve_cache_dir;

/// The page given on the command line plays the active tab.
const ACTIVE_TAB_ID: TargetId = 1;

pub async fn run(flags: Flags) -> Result<i32, AnyError> {
  let cache_dir = resolve_cache_dir(
    &flags,
    std::env::var_os(CACHE_DIR_ENV_VAR).map(PathBuf::from),
  )?;
  let storage: Arc<dyn CacheStorage> =
    Arc::new(SqliteCacheStorage::open(cache_dir)?);
  let targets =
    Arc::new(StaticTarget::new(ActiveTarget::new(ACTIVE_TAB_ID, &flags.url)));

  let options = EnumerateOptions {
    match_mode: flags.match_mode,
    shape: if flags.grouped {
      OutputShape::Grouped
    } else {
      OutputShape::Flat
    },
    include_headers: flags.headers,
  };
  let enumerator = if flags.injected {
    let dispatcher = LocalDispatcher::new();
    dispatcher.attach(ACTIVE_TAB_ID, storage);
    let context = InjectedContext::new(Arc::new(dispatcher), targets.clone());
    Enumerator::new(Arc::new(context), options)
  } else {
    Enumerator::direct(storage, options)
  };
  let (messenger, service) = BackgroundService::new(enumerator).spawn();

  let view = match flags.subcommand {
    CacheAccessorSubcommand::List => {
      let mut presenter = Presenter::new(
        DataSource::Caches,
        messenger,
        targets,
        Box::new(TerminalRenderer),
        Box::new(DirectorySink::new(PathBuf::from("."))),
      );
      if let Some(term) = &flags.filter {
        presenter.filter(term);
      }
      presenter.load().await;
      presenter.view().clone()
    }
    CacheAccessorSubcommand::Export(export_flags) => {
      let source = if export_flags.storage_data {
        DataSource::StorageData
      } else {
        DataSource::Caches
      };
      let mut presenter = Presenter::new(
        source,
        messenger,
        targets,
        Box::new(TerminalRenderer),
        Box::new(DirectorySink::new(export_flags.output)),
      );
      // failures are already on screen through the error view
      let _ = presenter.export().await;
      presenter.view().clone()
    }
  };

  // the presenter held the last sender, so the service winds down
  service.await?;
  Ok(if matches!(view, View::Error(_)) { 1 } else { 0 })
}

struct TerminalRenderer;

impl Renderer for TerminalRenderer {
  fn render(&mut self, view: &View) {
    match view {
      View::Loading => eprintln!("Loading..."),
      View::Error(message) => eprintln!("{}", message),
      View::Empty | View::Loaded(_) => print!("{}", format_view(view)),
    }
  }
}

/// Writes exported documents into a directory under their own file name.
struct DirectorySink {
  dir: PathBuf,
}

impl DirectorySink {
  fn new(dir: PathBuf) -> Self {
    Self { dir }
  }
}

impl ExportSink for DirectorySink {
  fn save(&mut self, document: &ExportDocument) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(&self.dir)?;
    let path = self.dir.join(&document.file_name);
    std::fs::write(&path, &document.contents)?;
    log::info!("Exported to {}", path.display());
    Ok(())
  }
}

fn format_view(view: &View) -> String {
  match view {
    View::Loading => "Loading...\n".to_string(),
    View::Empty => "No cache data found\n".to_string(),
    View::Error(message) => format!("{}\n", message),
    View::Loaded(loaded) => format_loaded(loaded),
  }
}

fn format_loaded(view: &LoadedView) -> String {
  let mut out = String::new();
  match view.result() {
    AggregateResult::Flat(entries) => {
      for entry in entries.iter().filter(|e| view.is_visible(e)) {
        write_entry(&mut out, entry, "");
      }
    }
    AggregateResult::Grouped(groups) => {
      for group in groups {
        let visible = group
          .entries
          .iter()
          .filter(|e| view.is_visible(e))
          .collect::<Vec<_>>();
        if visible.is_empty() {
          continue;
        }
        let _ = writeln!(out, "{}", group.name);
        for entry in visible {
          write_entry(&mut out, entry, "  ");
        }
      }
    }
  }
  let _ = writeln!(
    out,
    "Total items: {}  Total size: {}",
    view.item_count(),
    format_size(view.total_size())
  );
  out
}

fn write_entry(out: &mut String, entry: &CacheEntry, indent: &str) {
  let _ = writeln!(
    out,
    "{}{:<43} {:<24} {:>9}  {} {}  [{}]",
    indent,
    truncate_url(&entry.url),
    entry.content_type,
    format_size(entry.size),
    entry.status,
    entry.status_text,
    entry.cache_name,
  );
  if let Some(headers) = &entry.headers {
    for (name, value) in headers {
      let _ = writeln!(out, "{}    {}: {}", indent, name, value);
    }
  }
}

#[cfg(test)]
mod tests {
  use cache_accessor_inspect::CacheGroup;
  use pretty_assertions::assert_eq;

  use super::*;

  fn entry(url: &str, cache_name: &str, size: u64) -> CacheEntry {
    CacheEntry {
      url: url.to_string(),
      content_type: "text/javascript".to_string(),
      size,
      status: 200,
      status_text: "OK".to_string(),
      last_modified: None,
      expires: None,
      cache_control: None,
      cache_name: cache_name.to_string(),
      headers: None,
    }
  }

  #[test]
  fn empty_view() {
    assert_eq!(format_view(&View::Empty), "No cache data found\n");
  }

  #[test]
  fn flat_view_with_filter() {
    let result = AggregateResult::Flat(vec![
      entry("https://example.com/app.js", "v1", 42),
      entry("https://example.com/vendor.js", "v1", 2048),
    ]);
    let text = format_view(&View::Loaded(LoadedView::new(result, "APP")));
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("https://example.com/app.js "));
    assert!(lines[0].contains("42 B"));
    assert!(lines[0].ends_with("[v1]"));
    // totals cover hidden entries too
    assert_eq!(lines[1], "Total items: 2  Total size: 2.0 KB");
  }

  #[test]
  fn grouped_view() {
    let mut with_headers = entry("https://example.com/a.css", "v2", 1);
    with_headers.headers = Some(
      [("content-type".to_string(), "text/css".to_string())]
        .into_iter()
        .collect(),
    );
    let result = AggregateResult::Grouped(vec![
      CacheGroup {
        name: "v1".to_string(),
        entries: vec![entry("https://example.com/app.js", "v1", 10)],
      },
      CacheGroup {
        name: "v2".to_string(),
        entries: vec![with_headers],
      },
    ]);
    let text = format_view(&View::Loaded(LoadedView::new(result.clone(), "")));
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "v1");
    assert!(lines[1].starts_with("  https://example.com/app.js"));
    assert_eq!(lines[2], "v2");
    assert_eq!(lines[4], "      content-type: text/css");
    assert_eq!(lines[5], "Total items: 2  Total size: 11 B");

    // groups without visible entries are left out
    let text = format_view(&View::Loaded(LoadedView::new(result, "css")));
    assert!(!text.contains("v1\n"));
    assert!(text.starts_with("v2\n"));
  }

  #[test]
  fn long_urls_are_truncated() {
    let url = format!("https://example.com/{}", "a".repeat(60));
    let result = AggregateResult::Flat(vec![entry(&url, "v1", 1)]);
    let text = format_view(&View::Loaded(LoadedView::new(result, "")));
    assert!(text.starts_with(&format!("{}...", &url[..40])));
  }

  #[test]
  fn directory_sink_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path().join("out"));
    sink
      .save(&ExportDocument {
        file_name: "cache-export.json".to_string(),
        contents: "[]".to_string(),
      })
      .unwrap();
    assert_eq!(
      std::fs::read_to_string(dir.path().join("out/cache-export.json"))
        .unwrap(),
      "[]"
    );
  }

  #[tokio::test]
  async fn missing_storage_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let flags = Flags {
      url: "https://example.com".to_string(),
      cache_dir: Some(dir.path().to_path_buf()),
      ..Default::default()
    };
    let err = run(flags).await.unwrap_err();
    assert!(err.to_string().contains("Cache storage not found"));
  }
}
