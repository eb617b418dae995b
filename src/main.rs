//! Entry point: CLI/config resolution, logging setup, and the FUSE mount
//! call (spec.md §6, SPEC_FULL.md §6).

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use fuser::MountOption;
use tracing_subscriber::EnvFilter;

use zoofs::config::load_file_config;
use zoofs::{Cli, Config, FsOps, Session};

/// Splits the process argv at a literal `--`: everything before it is parsed
/// as [`Cli`]; everything after is forwarded to the kernel as raw `-o`-style
/// mount options (spec.md §6).
fn split_args() -> (Vec<OsString>, Vec<OsString>) {
    let mut args: Vec<OsString> = std::env::args_os().collect();
    let separator = args.iter().position(|a| a.to_str() == Some("--"));
    match separator {
        Some(idx) => {
            let kernel_args = args.split_off(idx + 1);
            args.pop(); // drop the "--" itself
            (args, kernel_args)
        }
        None => (args, Vec::new()),
    }
}

fn mount_options(extra: &[OsString]) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName("zoofs".to_string()),
        MountOption::DefaultPermissions,
        MountOption::AutoUnmount,
    ];
    for raw in extra {
        if let Some(text) = raw.to_str() {
            for token in text.split(',') {
                if token.is_empty() || token == "-o" {
                    continue;
                }
                options.push(MountOption::from_str(token));
            }
        }
    }
    options
}

fn init_logging(config: &Config) {
    let default_level = tracing::level_filters::LevelFilter::from_level(config.log_level.as_tracing_level());
    let filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    match &config.log_file {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "zoofs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Leaked intentionally: the guard must outlive the whole process
            // and this function only runs once, at startup.
            Box::leak(Box::new(guard));
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

fn main() -> std::io::Result<()> {
    let (own_args, kernel_args) = split_args();
    let cli = Cli::parse_from(own_args);

    let file_config = match &cli.config {
        Some(path) => Some(load_file_config(path)?),
        None => None,
    };

    let mountpoint: PathBuf = match &cli.mountpoint {
        Some(path) => path.clone(),
        None => {
            eprintln!("zoofs: a mount point is required");
            std::process::exit(2);
        }
    };

    let config = Config::resolve(cli, file_config);
    init_logging(&config);

    tracing::info!(root = %config.root_path, leaf_mode = ?config.leaf_mode, "starting zoofs");

    let session = Session::new(config);
    let fs = FsOps::new(session);

    fuser::mount2(fs, &mountpoint, &mount_options(&kernel_args))
}
