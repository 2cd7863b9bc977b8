// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the boundary between the outside world (Arrow batches coming
// from the dataset store, `f64` cells coming from extracted rows) and the pure,
// decimal-exact `compare` engine.
//
// Data Flow:
//
//   1. [Dataset store]                     -> RecordBatch (nuc_ix, name, values...)
//         |
//         `-> table_from_record_batch -> `types::Table` (Option<Decimal> cells)
//
//   2. [compare::pipeline]                 -> align -> compute -> merge
//         |
//         `-> merged `types::Table`
//
//   3. [Consumers]                          -> table_to_record_batch -> RecordBatch
//                                              (Decimal128 value columns)
//
// ====================================================================================
pub(crate) mod arrow_impl;
pub mod decimal;

pub use arrow_impl::{table_from_record_batch, table_to_record_batch};
pub use decimal::{decimal_from_f64, decimal_to_f64};
