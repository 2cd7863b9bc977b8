//! The middle-step codec: packs the variable-length list of intermediate values
//! of one extracted row into a single self-describing binary value, and expands
//! it back into named fields.

pub mod middle_steps;
pub mod row;
pub(crate) mod wire;

pub use middle_steps::{decode, encode, MiddleStep, MiddleStepIter, MiddleSteps};
pub use row::{decode_row, encode_row, RowValue, StepFields, MIN_ENCODED_ROW_LEN};
