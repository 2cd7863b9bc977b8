// In: src/traits.rs

//! Defines the seam between the comparison pipeline and wherever simulation
//! results are stored.
//!
//! The orchestration layer only resolves names and fetches tables through
//! `DatasetSource`; it never knows whether the rows come from a database, a set
//! of Arrow files or an in-memory fixture.

use crate::error::NucdiffError;
use crate::types::{DataFile, PhysicalQuantity, Table};

/// Name that selects every physical quantity a source knows about.
pub const ALL_QUANTITIES: &str = "all";

/// A read-only store of per-file, per-quantity result tables.
pub trait DatasetSource {
    /// Looks up a registered file by its name.
    fn file_by_name(&self, name: &str) -> Result<DataFile, NucdiffError>;

    /// Looks up a physical quantity by its name.
    fn physical_quantity_by_name(&self, name: &str) -> Result<PhysicalQuantity, NucdiffError>;

    /// Every known physical quantity, in the store's order.
    fn all_physical_quantities(&self) -> Result<Vec<PhysicalQuantity>, NucdiffError>;

    /// Fetches the table of `quantity` for `file`.
    ///
    /// With `is_all_step` the table carries every recorded step column;
    /// otherwise only the final step. The first two columns are always the
    /// `(nuc_ix, name)` key. An empty table means no data was recorded.
    fn fetch_table(
        &self,
        file: &DataFile,
        quantity: &PhysicalQuantity,
        is_all_step: bool,
    ) -> Result<Table, NucdiffError>;

    /// Resolves quantity names, expanding `"all"` to every known quantity.
    fn physical_quantities_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<PhysicalQuantity>, NucdiffError> {
        if names.iter().any(|n| n.eq_ignore_ascii_case(ALL_QUANTITIES)) {
            return self.all_physical_quantities();
        }
        names
            .iter()
            .map(|name| self.physical_quantity_by_name(name))
            .collect()
    }
}
