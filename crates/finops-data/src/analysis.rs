//! Table analysis pipeline.
//!
//! Normalizes a raw [`Table`], turns it into insight chunks and returns an
//! [`TableAnalysis`] ready for the ingestion layer.

use finops_core::models::{join_chunks, Chunk, Table};
use finops_core::settings::ReportConfig;
use serde::Serialize;
use tracing::{debug, warn};

use crate::chunker::ChunkGenerator;
use crate::normalizer::{normalize, BillingTable};

// ── Public types ──────────────────────────────────────────────────────────────

/// The complete output of [`analyze_table`].
#[derive(Debug, Clone, Serialize)]
pub struct TableAnalysis {
    /// Normalized table, including the derived `month` column when a `date`
    /// column exists.
    pub table: BillingTable,
    pub chunks: Vec<Chunk>,
    /// All chunk texts joined by a blank line.
    pub text: String,
    /// Why the result is less complete than it could be. Empty when clean.
    pub degradations: Vec<String>,
}

impl TableAnalysis {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Normalize column names and values.
/// 2. Generate chunks from the normalized table.
/// 3. Add the `month` column to the returned table.
/// 4. Join the chunk texts.
///
/// Chunks are generated before the `month` column is added, so a raw dump
/// fallback never includes it.
pub fn analyze_table(raw: Table, config: &ReportConfig) -> TableAnalysis {
    let (mut table, mut degradations) = normalize(raw).into_parts();

    let (chunks, chunk_reasons) = ChunkGenerator::new(config.clone())
        .generate(&table)
        .into_parts();
    degradations.extend(chunk_reasons);

    if table.add_month_column() {
        debug!("added month column");
    }

    let text = join_chunks(&chunks);

    for reason in &degradations {
        warn!("analysis degraded: {}", reason);
    }

    debug!(
        "analysis complete: {} rows, {} chunks",
        table.row_count(),
        chunks.len()
    );

    TableAnalysis {
        table,
        chunks,
        text,
        degradations,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
