//! Shared building blocks for the finops chunker: the cell/table model,
//! chunk and outcome types, currency formatting, date parsing, errors and
//! settings.

pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{FinopsError, Result};
