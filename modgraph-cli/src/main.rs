mod commands;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use commands::CliError;
use modgraph_core::{Config, LibraryLock, PersistOptions};

const USAGE: &str = "usage: modgraph [--verbose] <command>

commands:
  info <file>                         show file kind, version and summary
  dump <file>                         print contents as JSON
  new-project <file>                  write an empty project
  new-library <file> <name> [tag...]  write a library with one entry";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modgraph")
        .join("modgraph.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("modgraph: cannot create log file {}: {}", log_path.display(), e);
            return;
        }
    };

    if WriteLogger::init(log_level, Config::default(), log_file).is_err() {
        eprintln!("modgraph: logger already initialized");
        return;
    }

    log::info!("modgraph starting (log level: {:?})", log_level);
}

fn library_lock(config: &Config) -> Result<LibraryLock, CliError> {
    config.library_lock().ok_or_else(|| {
        CliError::Usage("no data directory for the library lock; set library.lock_path".into())
    })
}

fn run(args: &[String]) -> Result<(), CliError> {
    let config = Config::load();
    let options = PersistOptions::from_config(&config);
    let mut out = io::stdout().lock();

    let usage = || CliError::Usage(USAGE.to_string());
    let (command, rest) = args.split_first().ok_or_else(usage)?;
    let file = rest.first().map(Path::new).ok_or_else(usage)?;

    match command.as_str() {
        "info" => commands::info(file, &library_lock(&config)?, &options, &mut out),
        "dump" => commands::dump(file, &library_lock(&config)?, &options, &mut out),
        "new-project" => commands::new_project(file, &options, &mut out),
        "new-library" => {
            let name = rest.get(1).ok_or_else(usage)?;
            commands::new_library(file, name, &rest[2..], &library_lock(&config)?, &mut out)
        }
        _ => Err(usage()),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let args: Vec<String> = args
        .into_iter()
        .filter(|a| a != "--verbose" && a != "-v")
        .collect();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("modgraph: {}", e);
        std::process::exit(match e {
            CliError::Usage(_) => 2,
            _ => 1,
        });
    }
}
