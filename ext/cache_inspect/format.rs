// Copyright 2018-2026 the Deno authors. MIT license.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
const MAX_URL_LENGTH: usize = 40;

/// Human readable size in binary units. Plain bytes are printed as an
/// integer, every larger unit with one decimal.
pub fn format_size(bytes: u64) -> String {
  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut size = bytes as f64;
  let mut unit = 0;
  while size >= 1024.0 && unit < UNITS.len() - 1 {
    size /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", size, UNITS[unit])
}

pub fn truncate_url(url: &str) -> String {
  match url.char_indices().nth(MAX_URL_LENGTH) {
    Some((index, _)) => format!("{}...", &url[..index]),
    None => url.to_string(),
  }
}
