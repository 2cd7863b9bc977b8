//! This file is the root of the `nucdiff` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`compare`, `codec`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the small surface most callers need: configuration, the
//!     comparison entry points, the report writer and the middle-step codec.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod codec;
pub mod compare;
pub mod config;
pub mod error;
pub mod kernels;
pub mod report;
pub mod source;
pub mod traits;
pub mod types;

#[doc(hidden)]
pub use log as __log;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use compare::{calculate_comparative_result, compare_tables, ComparisonOptions, ComparisonRequest};
pub use config::{CompareConfig, DeviationMode};
pub use codec::{decode_row, encode_row, MiddleSteps, RowValue, StepFields};
pub use error::NucdiffError;
pub use report::{save_to_xlsx, ComparisonReport};
pub use source::InMemorySource;
pub use traits::DatasetSource;
pub use types::{DataFile, PhysicalQuantity, QuantitySelection, Selector, Table};
