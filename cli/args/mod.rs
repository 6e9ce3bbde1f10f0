// Copyright 2018-2026 the Deno authors. MIT license.

mod flags;

use std::path::PathBuf;

use anyhow::Error as AnyError;
use anyhow::bail;
pub use flags::*;

pub const CACHE_DIR_ENV_VAR: &str = "CACHE_ACCESSOR_DIR";

/// The cache storage directory to read: `--cache-dir` if given, otherwise
/// `$CACHE_ACCESSOR_DIR`.
pub fn resolve_cache_dir(
  flags: &Flags,
  env_value: Option<PathBuf>,
) -> Result<PathBuf, AnyError> {
  if let Some(dir) = &flags.cache_dir {
    return Ok(dir.clone());
  }
  match env_value {
    Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
    _ => bail!(
      "No cache storage directory. Pass --cache-dir or set {}",
      CACHE_DIR_ENV_VAR
    ),
  }
}
