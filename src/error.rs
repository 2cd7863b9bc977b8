// In: src/error.rs

//! This module defines the single, unified error type for the entire nucdiff library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NucdiffError {
    // =========================================================================
    // === Configuration Errors (fatal, never data-driven)
    // =========================================================================
    #[error("Wrong deviation mode '{0}': expected 'relative' or 'absolute'")]
    InvalidDeviationMode(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    // =========================================================================
    // === Comparison Errors
    // =========================================================================
    #[error("Division by zero in column '{column}' at row {row}")]
    DivisionByZero { column: String, row: usize },

    #[error("Table schema error: {0}")]
    SchemaError(String),

    #[error("Unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    #[error("Decimal conversion failed: {0}")]
    DecimalConversion(String),

    #[error("Dataset source error: {0}")]
    SourceError(String),

    // =========================================================================
    // === Codec Errors
    // =========================================================================
    #[error("Middle step encoding error: {0}")]
    MiddleStepEncodeError(String),

    #[error("Middle step decoding error: {0}")]
    MiddleStepDecodeError(String),

    #[error("LEB128 decoding error: {0}")]
    Leb128DecodeError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error from the workbook writer.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<rust_decimal::Error> for NucdiffError {
    fn from(err: rust_decimal::Error) -> Self {
        NucdiffError::DecimalConversion(err.to_string())
    }
}
