use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the hookcache binary.
#[derive(Debug, Parser)]
#[command(
    name = "hookcache",
    version,
    about = "Read-through cache hooks for CRUD services"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "HOOKCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a recorded list of service calls through a cached in-memory service.
    Replay(ReplayArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// JSON file holding `{ "documents": [...], "requests": [...] }`.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Print cached entry and backend call counts after the last request.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub stats: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the cache hooks.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the cache capacity (0 = unbounded).
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,

    /// Toggle info-level logging of cache hits.
    #[arg(
        long = "cache-log-hits",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_log_hits: Option<bool>,

    /// Sort query keys so logically equal queries share one entry.
    #[arg(
        long = "cache-sort-query-keys",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_sort_query_keys: Option<bool>,
}
