// Copyright 2018-2026 the Deno authors. MIT license.

use std::io::Write;

use anyhow::Error as AnyError;

struct CliLogger(env_logger::Logger);

impl CliLogger {
  pub fn new(logger: env_logger::Logger) -> Self {
    Self(logger)
  }

  pub fn filter(&self) -> log::LevelFilter {
    self.0.filter()
  }
}

impl log::Log for CliLogger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    self.0.enabled(metadata)
  }

  fn log(&self, record: &log::Record) {
    if self.enabled(record.metadata()) {
      self.0.log(record);
    }
  }

  fn flush(&self) {
    self.0.flush();
  }
}

pub fn init(maybe_level: Option<log::Level>) -> Result<(), AnyError> {
  let log_level = maybe_level.unwrap_or(log::Level::Info);
  let logger = env_logger::Builder::from_env(
    env_logger::Env::new()
      // Use `CACHE_ACCESSOR_LOG` and `CACHE_ACCESSOR_LOG_STYLE` instead of
      // the `RUST_` prefix
      .filter_or("CACHE_ACCESSOR_LOG", log_level.to_level_filter().to_string())
      .write_style("CACHE_ACCESSOR_LOG_STYLE"),
  )
  .filter_module("rusqlite", log::LevelFilter::Error)
  .format(|buf, record| {
    let mut target = record.target().to_string();
    if let Some(line_no) = record.line() {
      target.push(':');
      target.push_str(&line_no.to_string());
    }
    if record.level() <= log::Level::Info {
      // Print ERROR, WARN and INFO logs as they are
      writeln!(buf, "{}", record.args())
    } else {
      // Add prefix to DEBUG or TRACE logs
      writeln!(
        buf,
        "{} RS - {} - {}",
        record.level(),
        target,
        record.args()
      )
    }
  })
  .build();

  let cli_logger = CliLogger::new(logger);
  let max_level = cli_logger.filter();
  log::set_boxed_logger(Box::new(cli_logger))?;
  log::set_max_level(max_level);
  Ok(())
}
