//! Logging initialization.
//!
//! Verbose runs log to stderr. Otherwise logs are appended to a file in the
//! standard state directory, falling back to stderr when it cannot be opened.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const CRATES: [&str; 4] = ["snapback", "snapback_core", "snapback_snapshot", "snapback_util"];

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        let directives = CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(directives)
    })
}

/// Initialize logging. Returns the log file path if logging to a file.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    if verbose {
        init_stderr(verbose);
        return None;
    }

    let Some(log_dir) = snapback_util::path::logs_dir() else {
        init_stderr(verbose);
        return None;
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {e}");
        init_stderr(verbose);
        return None;
    }

    let log_file = log_dir.join("snapback.log");
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            init_stderr(verbose);
            return None;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .with_ansi(false)
        .with_writer(file)
        .init();

    Some(log_file)
}

fn init_stderr(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
