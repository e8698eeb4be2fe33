mod bootstrap;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use finops_core::settings::Settings;
use finops_ingest::converter::CommandConverter;
use finops_ingest::router::{Extraction, IngestionRouter};
use serde::Serialize;

/// Extraction result for one input file.
#[derive(Debug, Serialize)]
struct FileReport {
    source: String,
    #[serde(flatten)]
    extraction: Extraction,
}

#[tokio::main]
async fn main() -> Result<()> {
    let (settings, config) = Settings::load();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("finops-chunker v{} starting", env!("CARGO_PKG_VERSION"));

    let files = bootstrap::collect_inputs(&settings.inputs)?;
    if files.is_empty() {
        tracing::warn!("no supported files found");
        return Ok(());
    }
    tracing::info!(
        "processing {} file(s) with converter '{}'",
        files.len(),
        settings.converter
    );

    let converter = Arc::new(CommandConverter::new(
        settings.converter.clone(),
        settings.converter_args.clone(),
    ));
    let router = Arc::new(IngestionRouter::new(converter, config));

    let reports = ingest_all(router, files).await?;

    let output = match settings.format.as_str() {
        "json" => serde_json::to_string_pretty(&reports)?,
        _ => render_text(&reports),
    };
    println!("{}", output);

    Ok(())
}

/// Ingest every file on the blocking pool, returning results in input order.
///
/// A file that fails to read gets an error report; the others still run.
async fn ingest_all(router: Arc<IngestionRouter>, files: Vec<PathBuf>) -> Result<Vec<FileReport>> {
    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let router = Arc::clone(&router);
            tokio::task::spawn_blocking(move || {
                tracing::info!("ingesting {}", path.display());
                FileReport {
                    source: path.display().to_string(),
                    extraction: router.extract_path(&path),
                }
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("ingestion task failed")?);
    }
    Ok(reports)
}

/// Plain-text output; a `==> path <==` header precedes each file when there
/// is more than one.
fn render_text(reports: &[FileReport]) -> String {
    if let [only] = reports {
        return only.extraction.text.clone();
    }
    reports
        .iter()
        .map(|r| format!("==> {} <==\n{}", r.source, r.extraction.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
