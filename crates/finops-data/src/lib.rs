//! Billing data layer for finops-chunker.
//!
//! Reads CSV and spreadsheet exports, normalizes their columns, aggregates
//! spend and renders the result as self-contained text chunks.

pub mod aggregator;
pub mod analysis;
pub mod chunker;
pub mod normalizer;
pub mod reader;

pub use finops_core as core;
