// In: src/report/mod.rs

//! The comparison report: one merged table per physical quantity, in the order
//! the quantities were compared, and the file naming used when it is saved.

use std::path::{Path, PathBuf};

use crate::error::NucdiffError;
use crate::types::Table;

pub mod xlsx;

pub use xlsx::save_to_xlsx;

/// The result of comparing one reference file against one comparison file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComparisonReport {
    pub reference_file: String,
    pub comparison_file: String,
    pub is_all_step: bool,
    sections: Vec<(String, Table)>,
}

impl ComparisonReport {
    pub fn new(
        reference_file: impl Into<String>,
        comparison_file: impl Into<String>,
        is_all_step: bool,
    ) -> Self {
        Self {
            reference_file: reference_file.into(),
            comparison_file: comparison_file.into(),
            is_all_step,
            sections: Vec::new(),
        }
    }

    /// Adds the merged table of one quantity. A repeated quantity replaces the
    /// earlier table in place.
    pub fn insert(&mut self, quantity: impl Into<String>, table: Table) {
        let quantity = quantity.into();
        match self.sections.iter_mut().find(|(name, _)| *name == quantity) {
            Some(section) => section.1 = table,
            None => self.sections.push((quantity, table)),
        }
    }

    pub fn get(&self, quantity: &str) -> Option<&Table> {
        self.sections
            .iter()
            .find(|(name, _)| name == quantity)
            .map(|(_, table)| table)
    }

    pub fn quantities(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    pub fn sections(&self) -> &[(String, Table)] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Writes this report under `result_dir`, returning the workbook path.
    pub fn save(&self, result_dir: &Path) -> Result<PathBuf, NucdiffError> {
        save_to_xlsx(
            self,
            result_dir,
            &self.reference_file,
            &self.comparison_file,
            self.is_all_step,
        )
    }
}

/// `all_step_{ref}_vs_{cmp}.xlsx` for all-step runs, `{ref}_vs_{cmp}.xlsx` otherwise.
pub fn report_file_name(reference: &str, comparison: &str, is_all_step: bool) -> String {
    if is_all_step {
        format!("all_step_{}_vs_{}.xlsx", reference, comparison)
    } else {
        format!("{}_vs_{}.xlsx", reference, comparison)
    }
}

/// Full path of a report: `{result_dir}/{reference}/{file name}`.
pub fn report_path(result_dir: &Path, reference: &str, comparison: &str, is_all_step: bool) -> PathBuf {
    result_dir
        .join(reference)
        .join(report_file_name(reference, comparison, is_all_step))
}
