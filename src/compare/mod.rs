// In: src/compare/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Comparison Engine
// ====================================================================================
//
// Every stage is a pure function over `types::Table`; none of them reads
// configuration or touches a dataset source.
//
//   reference Table ---.
//                      |--> align   (pad narrower side with missing step columns)
//   comparison Table --'       |
//                              v
//                           compute (exact per-cell deviation + ReservedIndex mask)
//                              |
//                              v
//                           merge   (filter by mask, outer join on key, append
//                                    deviation columns, drop all-missing columns)
//
// `pipeline` chains the three for one quantity and drives a whole run over a
// `DatasetSource`.
//
// ====================================================================================
pub mod align;
pub mod deviation;
pub mod merge;
pub mod pipeline;

pub use align::align;
pub use deviation::{compute, DeviationTable, ReservedIndex, LAST_STEP_DEVIATION_COLUMN};
pub use merge::merge;
pub use pipeline::{
    calculate_comparative_result, compare_tables, ComparisonOptions, ComparisonRequest,
};
