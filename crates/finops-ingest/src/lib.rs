//! Ingestion layer for finops-chunker.
//!
//! Routes uploaded files to the tabular pipeline or to an injected document
//! converter and returns the extracted text.

pub mod converter;
pub mod router;

pub use finops_core as core;
pub use finops_data as data;
