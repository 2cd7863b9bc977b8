// In: src/compare/pipeline.rs

//! High-level orchestration: one quantity through align -> compute -> merge,
//! and a whole reference-vs-comparison run over a `DatasetSource`.

use rust_decimal::Decimal;

use super::{align, deviation, merge};
use crate::config::{default_threshold, CompareConfig, DeviationMode};
use crate::error::NucdiffError;
use crate::report::ComparisonReport;
use crate::traits::DatasetSource;
use crate::types::{DataFile, PhysicalQuantity, QuantitySelection, Selector, Table};

//==================================================================================
// 1. Options & Requests
//==================================================================================

/// Per-quantity comparison parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOptions {
    pub mode: DeviationMode,
    pub threshold: Decimal,
    pub keep_all_missing_columns: bool,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            mode: DeviationMode::default(),
            threshold: default_threshold(),
            keep_all_missing_columns: false,
        }
    }
}

/// Everything `calculate_comparative_result` needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    pub reference: Selector<DataFile>,
    pub comparison: Selector<DataFile>,
    pub physical_quantities: QuantitySelection,
    pub options: ComparisonOptions,
    pub is_all_step: bool,
    /// If set, only rows whose `name` is listed take part in the comparison.
    pub nuclides: Option<Vec<String>>,
}

impl ComparisonRequest {
    pub fn new(reference: Selector<DataFile>, comparison: Selector<DataFile>) -> Self {
        Self {
            reference,
            comparison,
            physical_quantities: QuantitySelection::default(),
            options: ComparisonOptions::default(),
            is_all_step: false,
            nuclides: None,
        }
    }

    pub fn from_config(config: &CompareConfig) -> Self {
        Self {
            reference: Selector::ByName(config.reference_file.clone()),
            comparison: Selector::ByName(config.comparison_file.clone()),
            physical_quantities: config.physical_quantities.to_selection(),
            options: ComparisonOptions {
                mode: config.deviation_mode,
                threshold: config.threshold,
                keep_all_missing_columns: config.keep_all_missing_columns,
            },
            is_all_step: config.is_all_step,
            nuclides: config.nuclides.clone(),
        }
    }
}

//==================================================================================
// 2. Single-Quantity Comparison
//==================================================================================

/// Compares two tables of the same quantity.
///
/// Both inputs are sorted by `(nuc_ix, name)` first so the positional deviation
/// pairs the same rows regardless of the order the source returned them in.
pub fn compare_tables(
    reference: &Table,
    comparison: &Table,
    reference_label: &str,
    comparison_label: &str,
    options: &ComparisonOptions,
) -> Result<Table, NucdiffError> {
    let (reference, comparison) = align::align(
        reference.sort_by_key(),
        comparison.sort_by_key(),
        reference_label,
        comparison_label,
    )?;

    let (deviation, reserved_index) =
        deviation::compute(&reference, &comparison, options.mode, options.threshold)?;

    merge::merge(
        &reference,
        &comparison,
        &deviation,
        &reserved_index,
        options.keep_all_missing_columns,
    )
}

//==================================================================================
// 3. Whole-Run Orchestration
//==================================================================================

fn resolve_quantities(
    source: &dyn DatasetSource,
    selection: QuantitySelection,
) -> Result<Vec<PhysicalQuantity>, NucdiffError> {
    match selection {
        QuantitySelection::All => source.all_physical_quantities(),
        QuantitySelection::ByNames(names) => source.physical_quantities_by_names(&names),
        QuantitySelection::ByEntities(quantities) => Ok(quantities),
    }
}

fn keep_nuclides(table: Table, nuclides: Option<&[String]>) -> Table {
    match nuclides {
        Some(names) => {
            let mask: Vec<bool> = table.names().iter().map(|n| names.contains(n)).collect();
            table.filter_rows(&mask)
        }
        None => table,
    }
}

/// Compares `request.reference` against `request.comparison` for every
/// selected physical quantity.
///
/// Quantities for which either side has no rows are skipped and left out of
/// the report.
pub fn calculate_comparative_result(
    source: &dyn DatasetSource,
    request: ComparisonRequest,
) -> Result<ComparisonReport, NucdiffError> {
    let reference = request.reference.resolve(|name| source.file_by_name(name))?;
    let comparison = request.comparison.resolve(|name| source.file_by_name(name))?;
    let quantities = resolve_quantities(source, request.physical_quantities)?;
    let nuclides = request.nuclides.as_deref();

    log::info!(
        "Comparing '{}' (reference) with '{}' over {} quantity(ies), mode {}, threshold {}",
        reference.name,
        comparison.name,
        quantities.len(),
        request.options.mode,
        request.options.threshold
    );

    let mut report = ComparisonReport::new(&reference.name, &comparison.name, request.is_all_step);

    for quantity in &quantities {
        let reference_table = keep_nuclides(
            source.fetch_table(&reference, quantity, request.is_all_step)?,
            nuclides,
        );
        let comparison_table = keep_nuclides(
            source.fetch_table(&comparison, quantity, request.is_all_step)?,
            nuclides,
        );

        if reference_table.is_empty() || comparison_table.is_empty() {
            log::warn!(
                "Skipping '{}': no rows for '{}' or '{}'",
                quantity.name,
                reference.name,
                comparison.name
            );
            continue;
        }

        let merged = compare_tables(
            &reference_table,
            &comparison_table,
            &reference.name,
            &comparison.name,
            &request.options,
        )?;

        log::info!(
            "'{}': {} row(s) above threshold, {} column(s)",
            quantity.name,
            merged.num_rows(),
            merged.width()
        );
        log_metric!(
            "event" = "quantity_compared",
            "quantity" = &quantity.name,
            "reference_rows" = reference_table.num_rows(),
            "comparison_rows" = comparison_table.num_rows(),
            "merged_rows" = merged.num_rows()
        );

        report.insert(quantity.name.clone(), merged);
    }

    Ok(report)
}
