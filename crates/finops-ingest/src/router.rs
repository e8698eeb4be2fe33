//! Ingestion router.
//!
//! Dispatches an [`Upload`] by its declared content type: CSV and XLSX go
//! through the tabular pipeline (reader, normalizer, chunk generator),
//! everything else is written to a temporary file and handed to the injected
//! [`DocumentConverter`].

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use finops_core::error::{FinopsError, Result};
use finops_core::models::Chunk;
use finops_core::settings::ReportConfig;
use finops_data::analysis::analyze_table;
use finops_data::normalizer::BillingTable;
use finops_data::reader::{content_type_for, read_csv, read_spreadsheet, CSV_MIME, XLSX_MIME};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::converter::DocumentConverter;

// ── Upload ────────────────────────────────────────────────────────────────────

/// One file handed to the router.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original file name, used only for the temp-file suffix.
    pub name: String,
    /// Declared MIME type.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| FinopsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, content_type_for(path), bytes))
    }

    pub fn kind(&self) -> ContentType {
        ContentType::from_mime(&self.content_type)
    }

    /// `.<ext>` from the last dot-separated part of the name, or `.tmp`.
    fn temp_suffix(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => format!(".{}", ext),
            None => ".tmp".to_string(),
        }
    }
}

// ── ContentType ───────────────────────────────────────────────────────────────

/// Which ingestion path an upload takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Csv,
    Spreadsheet,
    Document,
}

impl ContentType {
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            CSV_MIME => ContentType::Csv,
            XLSX_MIME => ContentType::Spreadsheet,
            _ => ContentType::Document,
        }
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// What the router produced for one upload.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Joined chunk text, converted markdown, or an `Error...` message.
    pub text: String,
    /// Normalized table for tabular uploads.
    pub table: Option<BillingTable>,
    pub chunks: Vec<Chunk>,
}

impl Extraction {
    fn error(text: String) -> Self {
        Self {
            text,
            table: None,
            chunks: Vec::new(),
        }
    }
}

// ── IngestionRouter ───────────────────────────────────────────────────────────

pub struct IngestionRouter {
    converter: Arc<dyn DocumentConverter>,
    config: ReportConfig,
}

impl IngestionRouter {
    pub fn new(converter: Arc<dyn DocumentConverter>, config: ReportConfig) -> Self {
        Self { converter, config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Extract text (and a table where possible) from `upload`.
    pub fn try_extract(&self, upload: &Upload) -> Result<Extraction> {
        let kind = upload.kind();
        debug!("routing '{}' ({}) as {:?}", upload.name, upload.content_type, kind);
        match kind {
            ContentType::Csv => self.extract_csv(&upload.bytes),
            ContentType::Spreadsheet => self.extract_spreadsheet(&upload.bytes),
            ContentType::Document => self.extract_document(upload),
        }
    }

    /// Like [`IngestionRouter::try_extract`], but failures are rendered into
    /// the returned text instead of being raised.
    pub fn extract(&self, upload: &Upload) -> Extraction {
        match self.try_extract(upload) {
            Ok(extraction) => extraction,
            Err(err) => {
                let text = self.error_text(upload.kind(), &err);
                warn!("'{}': {}", upload.name, text);
                Extraction::error(text)
            }
        }
    }

    /// Read `path` and extract it. A file that cannot be read yields an
    /// `Error processing file: ...` extraction instead of an error.
    pub fn extract_path(&self, path: &Path) -> Extraction {
        match Upload::from_path(path) {
            Ok(upload) => self.extract(&upload),
            Err(err) => {
                let text = format!("Error processing file: {}", error_chain(&err));
                warn!("{}", text);
                Extraction::error(text)
            }
        }
    }

    fn extract_csv(&self, bytes: &[u8]) -> Result<Extraction> {
        let raw = read_csv(bytes)?;
        if raw.is_empty() {
            return Err(FinopsError::EmptyCsv);
        }
        Ok(self.analyze(raw))
    }

    fn extract_spreadsheet(&self, bytes: &[u8]) -> Result<Extraction> {
        let raw = read_spreadsheet(bytes)?.ok_or(FinopsError::EmptySpreadsheet)?;
        Ok(self.analyze(raw))
    }

    fn analyze(&self, raw: finops_core::models::Table) -> Extraction {
        let analysis = analyze_table(raw, &self.config);
        info!(
            "extracted {} chunks from {} rows",
            analysis.chunks.len(),
            analysis.table.row_count()
        );
        Extraction {
            text: analysis.text,
            table: Some(analysis.table),
            chunks: analysis.chunks,
        }
    }

    /// The temp file is removed when `file` drops, on success and failure.
    fn extract_document(&self, upload: &Upload) -> Result<Extraction> {
        let mut file = tempfile::Builder::new()
            .prefix("finops-upload-")
            .suffix(&upload.temp_suffix())
            .tempfile()?;
        file.write_all(&upload.bytes)?;
        file.flush()?;

        let document = self.converter.convert(file.path())?;
        info!("converted '{}' with {}", upload.name, self.converter.name());

        Ok(Extraction {
            text: document.export_to_markdown(),
            table: None,
            chunks: Vec::new(),
        })
    }

    fn error_text(&self, kind: ContentType, err: &FinopsError) -> String {
        if err.is_empty_input() {
            return format!("Error: {}", err);
        }
        let reason = match err {
            FinopsError::CsvParse(msg)
            | FinopsError::Spreadsheet(msg)
            | FinopsError::Conversion(msg) => msg.clone(),
            other => other.to_string(),
        };
        match kind {
            ContentType::Csv => format!("Error processing CSV: {}", reason),
            ContentType::Spreadsheet => format!("Error processing Excel: {}", reason),
            ContentType::Document => format!(
                "Error processing file with {}: {}",
                self.converter.name(),
                reason
            ),
        }
    }
}

/// `err` followed by each of its sources, joined by `": "`.
fn error_chain(err: &FinopsError) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    text
}

// ── Tests ─────────────────────────────────────────────────────────────────────
