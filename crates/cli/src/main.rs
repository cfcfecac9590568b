//! pathwatch - print inotify events for one path until interrupted

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli_lib::config::{ConfigOverrides, WatchConfig};
use cli_lib::logging;
use std::path::PathBuf;
use tracing::info;
use watcher::Watcher;

/// Watch a file or directory and print every inotify event it produces
#[derive(Parser)]
#[command(name = "pathwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to watch ("." for the current directory)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("pathwatch: {:#}", err);
            1
        }
    };

    std::process::exit(code);
}

/// Returns the process exit code
fn run(cli: Cli) -> Result<i32> {
    let Some(path) = cli.path else {
        println!("{}", Cli::command().render_usage());
        return Ok(1);
    };

    let config = WatchConfig::resolve(cli.config.as_deref(), &cli.overrides)?;
    // Held until return so a file appender flushes before exit
    let _log_guard = logging::init(&config.log_level, config.log_file.as_deref())?;

    let target = match watcher::resolve_target(&path) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("{}", err);
            return Ok(err.exit_code());
        }
    };
    info!(path = %target.display(), ?config, "starting");

    let report = Watcher::new(target, config.watch_options()).run(std::io::stdout());

    for err in report.errors() {
        eprintln!("{}", err);
    }

    let code = report.exit_code();
    info!(code, "exiting");
    Ok(code)
}
