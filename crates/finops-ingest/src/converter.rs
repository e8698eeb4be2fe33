//! Document conversion for non-tabular uploads.
//!
//! The router never converts documents itself; it hands a file path to an
//! injected [`DocumentConverter`] and keeps whatever markdown comes back.

use std::path::Path;
use std::process::Command;

use finops_core::error::{FinopsError, Result};
use tracing::debug;

// ── ConvertedDocument ─────────────────────────────────────────────────────────

/// Result of converting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    markdown: String,
}

impl ConvertedDocument {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }

    /// The document rendered as markdown.
    pub fn export_to_markdown(&self) -> String {
        self.markdown.clone()
    }
}

// ── DocumentConverter ─────────────────────────────────────────────────────────

/// Turns an on-disk document (PDF, DOCX, HTML, ...) into markdown.
pub trait DocumentConverter: Send + Sync {
    /// Human-readable name used in error messages.
    fn name(&self) -> &str;

    fn convert(&self, path: &Path) -> Result<ConvertedDocument>;
}

// ── CommandConverter ──────────────────────────────────────────────────────────

/// Runs an external program as `<program> <args...> <path>` and captures its
/// stdout as markdown.
///
/// # Example
/// ```no_run
/// use finops_ingest::converter::{CommandConverter, DocumentConverter};
///
/// let converter = CommandConverter::new("markitdown", Vec::new());
/// let doc = converter.convert(std::path::Path::new("invoice.pdf")).unwrap();
/// println!("{}", doc.export_to_markdown());
/// ```
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl DocumentConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.program
    }

    fn convert(&self, path: &Path) -> Result<ConvertedDocument> {
        debug!("running {} on {}", self.program, path.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| FinopsError::Conversion(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FinopsError::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let markdown = String::from_utf8_lossy(&output.stdout).into_owned();
        if markdown.trim().is_empty() {
            return Err(FinopsError::Conversion(format!(
                "{} produced no output",
                self.program
            )));
        }

        Ok(ConvertedDocument::new(markdown))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_document_markdown() {
        let doc = ConvertedDocument::new("# Invoice");
        assert_eq!(doc.export_to_markdown(), "# Invoice");
    }

    #[test]
    fn test_missing_program_is_conversion_error() {
        let converter = CommandConverter::new("finops-no-such-converter", Vec::new());
        let err = converter.convert(Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, FinopsError::Conversion(_)));
        assert!(err.to_string().contains("finops-no-such-converter"));
    }

    #[cfg(unix)]
    #[test]
    fn test_cat_converter_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"hello invoice").unwrap();

        let converter = CommandConverter::new("cat", Vec::new());
        assert_eq!(converter.name(), "cat");
        let doc = converter.convert(file.path()).unwrap();
        assert_eq!(doc.export_to_markdown(), "hello invoice");
    }

    #[cfg(unix)]
    #[test]
    fn test_args_precede_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let converter = CommandConverter::new("echo", vec!["-n".to_string(), "converted".to_string()]);
        let doc = converter.convert(file.path()).unwrap();
        assert!(doc.export_to_markdown().starts_with("converted "));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let converter = CommandConverter::new("cat", Vec::new());
        assert!(converter.convert(file.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error() {
        let converter = CommandConverter::new("false", Vec::new());
        let err = converter.convert(Path::new("whatever")).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
