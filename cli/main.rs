// Copyright 2018-2026 the Deno authors. MIT license.

mod args;
mod tools;
mod util;

use std::env;

use anyhow::Error as AnyError;

use crate::args::CacheAccessorSubcommand;
use crate::args::Flags;
use crate::args::flags_from_vec;

async fn run_subcommand(flags: Flags) -> Result<i32, AnyError> {
  match flags.subcommand {
    CacheAccessorSubcommand::List | CacheAccessorSubcommand::Export(_) => {
      tools::inspect::run(flags).await
    }
  }
}

fn unwrap_or_exit<T>(result: Result<T, AnyError>) -> T {
  match result {
    Ok(value) => value,
    Err(error) => {
      eprintln!("error: {:#}", error);
      std::process::exit(1);
    }
  }
}

pub fn main() {
  let args: Vec<_> = env::args_os().collect();
  let flags = match flags_from_vec(args) {
    Ok(flags) => flags,
    Err(err) => err.exit(),
  };

  unwrap_or_exit(util::logger::init(flags.log_level));

  let runtime = unwrap_or_exit(
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(AnyError::from),
  );
  let exit_code = unwrap_or_exit(runtime.block_on(run_subcommand(flags)));
  std::process::exit(exit_code);
}
