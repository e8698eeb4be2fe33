use std::path::{Path, PathBuf};

use anyhow::bail;
use finops_data::reader::find_billing_files;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.finops-chunker/` exists.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ensure_directories_in(&home)
}

/// Create `<base>/.finops-chunker/` (including missing parents) and return it.
pub fn ensure_directories_in(base: &Path) -> anyhow::Result<PathBuf> {
    let app_dir = base.join(".finops-chunker");
    std::fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to an [`EnvFilter`] directive.
///
/// Unknown names are passed through unchanged.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" | "CRITICAL" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so that stdout carries only chunk output. Falls back to
/// `"info"` if the level string is not recognised.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(layer).init();

    Ok(())
}

// ── Input discovery ────────────────────────────────────────────────────────────

/// Expand the CLI inputs into a flat list of files.
///
/// Files are kept as given; directories are searched recursively for
/// supported extensions. A path that does not exist is an error.
pub fn collect_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = find_billing_files(input);
            tracing::debug!("{}: {} supported file(s)", input.display(), found.len());
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            bail!("input path does not exist: {}", input.display());
        }
    }
    Ok(files)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
