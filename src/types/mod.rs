//! This module defines the core, strongly-typed data representations used
//! throughout the comparison pipeline.
//!
//! It includes the keyed decimal `Table` every stage operates on, and the
//! entity/selector types the orchestration layer resolves before comparing.

pub mod source;
pub mod table;

// Re-export the main type(s) for easier access.
pub use source::{DataFile, PhysicalQuantity, QuantitySelection, Selector};
pub use table::{Column, RowKey, Table, KEY_COLUMN_COUNT, NAME_COLUMN, NUC_IX_COLUMN};
