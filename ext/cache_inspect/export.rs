// Copyright 2018-2026 the Deno authors. MIT license.

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;

use crate::AggregateResult;

/// A JSON document ready to be saved as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
  pub file_name: String,
  pub contents: String,
}

impl ExportDocument {
  pub fn new(
    prefix: &str,
    timestamp: DateTime<Utc>,
    data: &AggregateResult,
  ) -> Result<Self, serde_json::Error> {
    Ok(Self {
      file_name: export_file_name(prefix, timestamp),
      contents: serde_json::to_string_pretty(data)?,
    })
  }
}

/// `<prefix>-<ISO 8601 timestamp in UTC with milliseconds>.json`
pub fn export_file_name(prefix: &str, timestamp: DateTime<Utc>) -> String {
  format!(
    "{}-{}.json",
    prefix,
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
  )
}
