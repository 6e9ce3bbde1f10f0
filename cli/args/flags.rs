// Copyright 2018-2026 the Deno authors. MIT license.

use std::ffi::OsString;
use std::path::PathBuf;

use cache_accessor_inspect::MatchMode;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap::value_parser;
use log::Level;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportFlags {
  pub output: PathBuf,
  pub storage_data: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum CacheAccessorSubcommand {
  #[default]
  List,
  Export(ExportFlags),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Flags {
  pub subcommand: CacheAccessorSubcommand,
  /// URL of the page standing in for the active tab.
  pub url: String,
  pub cache_dir: Option<PathBuf>,
  pub match_mode: MatchMode,
  pub grouped: bool,
  pub headers: bool,
  pub injected: bool,
  pub filter: Option<String>,
  pub log_level: Option<Level>,
}

pub fn clap_root() -> Command {
  Command::new("cache-accessor")
    .bin_name("cache-accessor")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Inspect and export the Cache Storage entries of an origin")
    .subcommand_required(true)
    .arg_required_else_help(true)
    .disable_help_subcommand(true)
    .arg(
      Arg::new("log-level")
        .short('L')
        .long("log-level")
        .help("Set log level")
        .value_parser(["trace", "debug", "info"])
        .global(true),
    )
    .arg(
      Arg::new("quiet")
        .short('q')
        .long("quiet")
        .help("Suppress diagnostic output")
        .action(ArgAction::SetTrue)
        .global(true),
    )
    .subcommand(list_subcommand())
    .subcommand(export_subcommand())
}

fn list_subcommand() -> Command {
  inspect_args(
    Command::new("list")
      .about("List the cached entries that belong to the page's origin"),
  )
  .arg(
    Arg::new("filter")
      .long("filter")
      .value_name("TERM")
      .help("Only show entries whose URL contains TERM (case-insensitive)"),
  )
}

fn export_subcommand() -> Command {
  inspect_args(
    Command::new("export")
      .about("Write the cached entries of the page's origin to a JSON file"),
  )
  .arg(
    Arg::new("output")
      .short('o')
      .long("output")
      .value_name("DIR")
      .help("Directory to write the export into")
      .default_value(".")
      .value_parser(value_parser!(PathBuf)),
  )
  .arg(
    Arg::new("storage-data")
      .long("storage-data")
      .help("Use the storage data request and the 'storage-' file prefix")
      .action(ArgAction::SetTrue),
  )
}

fn inspect_args(cmd: Command) -> Command {
  cmd
    .arg(
      Arg::new("url")
        .required(true)
        .help("URL of the page whose caches are inspected"),
    )
    .arg(
      Arg::new("cache-dir")
        .long("cache-dir")
        .value_name("DIR")
        .help("Cache storage directory (defaults to $CACHE_ACCESSOR_DIR)")
        .value_parser(value_parser!(PathBuf)),
    )
    .arg(
      Arg::new("match")
        .long("match")
        .value_name("MODE")
        .help("How request URLs are matched against the origin")
        .long_help(
          "How request URLs are matched against the origin.
  origin:    the URL's scheme, host and port must equal the origin
  substring: the URL only has to contain the origin (may over-match)",
        )
        .value_parser(["origin", "substring"])
        .default_value("origin"),
    )
    .arg(
      Arg::new("grouped")
        .long("grouped")
        .help("Group entries by cache name")
        .action(ArgAction::SetTrue),
    )
    .arg(
      Arg::new("headers")
        .long("headers")
        .help("Include all response headers of every entry")
        .action(ArgAction::SetTrue),
    )
    .arg(
      Arg::new("injected")
        .long("injected")
        .help("Run the enumeration inside the page instead of directly")
        .action(ArgAction::SetTrue),
    )
}

pub fn flags_from_vec(args: Vec<OsString>) -> clap::error::Result<Flags> {
  let mut app = clap_root();
  let mut matches = app.try_get_matches_from_mut(&args)?;

  let mut flags = Flags::default();

  if matches.get_flag("quiet") {
    flags.log_level = Some(Level::Error);
  } else if let Some(log_level) = matches.get_one::<String>("log-level") {
    flags.log_level = match log_level.as_str() {
      "trace" => Some(Level::Trace),
      "debug" => Some(Level::Debug),
      "info" => Some(Level::Info),
      _ => unreachable!(),
    };
  }

  if let Some((subcommand, mut m)) = matches.remove_subcommand() {
    match subcommand.as_str() {
      "list" => list_parse(&mut flags, &mut m),
      "export" => export_parse(&mut flags, &mut m),
      _ => unreachable!(),
    }
  }

  Ok(flags)
}

fn list_parse(flags: &mut Flags, matches: &mut ArgMatches) {
  inspect_args_parse(flags, matches);
  flags.filter = matches.remove_one::<String>("filter");
  flags.subcommand = CacheAccessorSubcommand::List;
}

fn export_parse(flags: &mut Flags, matches: &mut ArgMatches) {
  inspect_args_parse(flags, matches);
  let output = matches.remove_one::<PathBuf>("output").unwrap();
  let storage_data = matches.get_flag("storage-data");
  flags.subcommand = CacheAccessorSubcommand::Export(ExportFlags {
    output,
    storage_data,
  });
}

fn inspect_args_parse(flags: &mut Flags, matches: &mut ArgMatches) {
  flags.url = matches.remove_one::<String>("url").unwrap();
  flags.cache_dir = matches.remove_one::<PathBuf>("cache-dir");
  flags.match_mode = match matches.remove_one::<String>("match").as_deref() {
    Some("substring") => MatchMode::Substring,
    _ => MatchMode::Origin,
  };
  flags.grouped = matches.get_flag("grouped");
  flags.headers = matches.get_flag("headers");
  flags.injected = matches.get_flag("injected");
}
