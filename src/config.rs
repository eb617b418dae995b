//! Mount configuration: the CLI surface (spec.md §6) plus an additive TOML
//! config-file layer (SPEC_FULL.md §6).

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

/// Tri-valued leaf-mode policy tag (spec.md §3 "LeafMode"). Immutable once
/// the mount starts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeafMode {
    Dir,
    File,
    Hybrid,
}

impl LeafMode {
    /// Parses the `--leafMode` flag. Unknown values map to `HYBRID`, per
    /// spec.md §6.
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "DIR" => LeafMode::Dir,
            "FILE" => LeafMode::File,
            _ => LeafMode::Hybrid,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ERROR" => LogLevel::Error,
            "WARNING" => LogLevel::Warning,
            "DEBUG" => LogLevel::Debug,
            "TRACE" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Command-line flags, split at a literal `--` from the flags `fuser`
/// consumes (mount point, FUSE mount options) — spec.md §6.
#[derive(Debug, Parser)]
#[command(name = "zoofs", about = "Mount a ZooKeeper-like tree store as a POSIX filesystem")]
pub struct Cli {
    /// Path to the mount point, consumed before `--` by the kernel binding;
    /// kept here too so `zoofs` can be invoked without a separating `--`.
    pub mountpoint: Option<PathBuf>,

    /// Root prefix under which this mount operates.
    #[arg(short = 'f', long = "zooPath")]
    pub zoo_path: Option<String>,

    /// Comma-separated host:port list.
    #[arg(short = 's', long = "zooHosts")]
    pub zoo_hosts: Option<String>,

    /// Auth scheme identifier, e.g. `digest`.
    #[arg(short = 'A', long = "zooAuthScheme")]
    pub zoo_auth_scheme: Option<String>,

    /// Auth credential string.
    #[arg(short = 'a', long = "zooAuthentication")]
    pub zoo_authentication: Option<String>,

    /// One of `DIR` (default), `FILE`, `HYBRID`.
    #[arg(short = 'l', long = "leafMode")]
    pub leaf_mode: Option<String>,

    /// Byte cap for any single node's content.
    #[arg(short = 'm', long = "maxFileSize")]
    pub max_file_size: Option<usize>,

    /// One of `ERROR|WARNING|INFO|DEBUG|TRACE`.
    #[arg(short = 'd', long = "logLevel")]
    pub log_level: Option<String>,

    /// Optional rolling-file logger destination directory; stdio logging is
    /// used when absent (SPEC_FULL.md §6).
    #[arg(long = "logFile")]
    pub log_file: Option<PathBuf>,

    /// Optional TOML config file; CLI flags override values it sets
    /// (SPEC_FULL.md §6).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

/// On-disk config-file shape, mirroring [`Cli`]'s fields. All fields are
/// optional; only given ones override the built-in defaults, and any CLI
/// flag given explicitly wins over the file.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub zoo_path: Option<String>,
    pub zoo_hosts: Option<String>,
    pub zoo_auth_scheme: Option<String>,
    pub zoo_authentication: Option<String>,
    pub leaf_mode: Option<String>,
    pub max_file_size: Option<usize>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved mount configuration (spec.md §3 "Session" attributes).
#[derive(Debug, Clone)]
pub struct Config {
    pub hosts: String,
    pub auth_scheme: Option<String>,
    pub auth_token: Option<String>,
    pub root_path: String,
    pub leaf_mode: LeafMode,
    pub max_file_size: usize,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Resolves a [`Cli`] parse against an optional [`FileConfig`] layer.
    /// Every field follows the same precedence chain: an explicit CLI flag
    /// wins, then the config file, then a hardcoded default — spec.md §6.
    pub fn resolve(cli: Cli, file: Option<FileConfig>) -> Self {
        let file = file.unwrap_or_default();

        let hosts = cli.zoo_hosts.or(file.zoo_hosts).unwrap_or_default();
        let root_path = cli.zoo_path.or(file.zoo_path).unwrap_or_else(|| "/".to_string());
        let auth_scheme = cli.zoo_auth_scheme.or(file.zoo_auth_scheme);
        let auth_token = cli.zoo_authentication.or(file.zoo_authentication);
        let leaf_mode = cli
            .leaf_mode
            .or(file.leaf_mode)
            .map(|raw| LeafMode::parse(&raw))
            .unwrap_or(LeafMode::Dir);
        let max_file_size = cli.max_file_size.or(file.max_file_size).unwrap_or(256 * 1024);
        let log_level = cli
            .log_level
            .or(file.log_level)
            .map(|raw| LogLevel::parse(&raw))
            .unwrap_or(LogLevel::Info);
        let log_file = cli.log_file.or(file.log_file);

        Config { hosts, auth_scheme, auth_token, root_path, leaf_mode, max_file_size, log_level, log_file }
    }
}

/// Loads a [`FileConfig`] from disk, if a path was given.
pub fn load_file_config(path: &std::path::Path) -> std::io::Result<FileConfig> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}
