// In: src/compare/merge.rs

//! Assembles the per-quantity report table from the filtered reference rows,
//! the filtered comparison rows and the deviation columns.

use hashbrown::{HashMap, HashSet};
use rust_decimal::Decimal;

use super::deviation::{DeviationTable, ReservedIndex};
use crate::error::NucdiffError;
use crate::types::{Column, RowKey, Table};

const REFERENCE_SUFFIX: &str = "_x";
const COMPARISON_SUFFIX: &str = "_y";

/// One output row of the outer join: the source row on each side, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JoinedRow {
    reference: Option<usize>,
    comparison: Option<usize>,
}

/// Filters both tables with `reserved_index`, outer-joins them on `(nuc_ix, name)`
/// and appends the deviation columns positionally.
///
/// Output rows are the retained reference rows in order, then the comparison
/// keys with no reference partner in comparison order. Value columns present
/// on both sides under the same name get `_x` / `_y` suffixes. Unless
/// `keep_all_missing_columns` is set, value columns with no value in any
/// output row are dropped.
pub fn merge(
    reference: &Table,
    comparison: &Table,
    deviation: &DeviationTable,
    reserved_index: &ReservedIndex,
    keep_all_missing_columns: bool,
) -> Result<Table, NucdiffError> {
    let reference = reference.filter_rows(reserved_index.as_slice());
    let comparison = comparison.filter_rows(reserved_index.as_slice());

    let rows = join_rows(&reference, &comparison);
    let keys: Vec<RowKey> = rows
        .iter()
        .filter_map(|row| match (row.reference, row.comparison) {
            (Some(i), _) => reference.key(i),
            (None, Some(j)) => comparison.key(j),
            (None, None) => None,
        })
        .collect();
    let num_rows = keys.len();
    let mut merged = Table::new(keys);

    let reference_names: HashSet<&str> = reference.columns().iter().map(|c| c.name.as_str()).collect();
    let comparison_names: HashSet<&str> = comparison.columns().iter().map(|c| c.name.as_str()).collect();

    for column in reference.columns() {
        let name = if comparison_names.contains(column.name.as_str()) {
            format!("{}{}", column.name, REFERENCE_SUFFIX)
        } else {
            column.name.clone()
        };
        let values = rows.iter().map(|row| row.reference.and_then(|i| column.get(i))).collect();
        merged.push_column(Column::new(name, values))?;
    }

    for column in comparison.columns() {
        let name = if reference_names.contains(column.name.as_str()) {
            format!("{}{}", column.name, COMPARISON_SUFFIX)
        } else {
            column.name.clone()
        };
        let values = rows.iter().map(|row| row.comparison.and_then(|j| column.get(j))).collect();
        merged.push_column(Column::new(name, values))?;
    }

    // The join never has fewer rows than the reserved index keeps.
    if deviation.num_rows() > num_rows {
        return Err(NucdiffError::SchemaError(format!(
            "Deviation has {} row(s) but only {} row(s) were joined",
            deviation.num_rows(),
            num_rows
        )));
    }
    if deviation.num_rows() < num_rows {
        log::debug!(
            "Padding deviation from {} to {} joined row(s)",
            deviation.num_rows(),
            num_rows
        );
    }
    for column in deviation.columns() {
        let values: Vec<Option<Decimal>> = (0..num_rows).map(|row| column.get(row)).collect();
        merged.push_column(Column::new(column.name.clone(), values))?;
    }

    if !keep_all_missing_columns {
        merged.drop_all_missing_columns();
    }
    Ok(merged)
}

fn join_rows(reference: &Table, comparison: &Table) -> Vec<JoinedRow> {
    let mut comparison_rows: HashMap<RowKey, usize> = HashMap::with_capacity(comparison.num_rows());
    for (j, key) in comparison.keys().enumerate() {
        if comparison_rows.contains_key(&key) {
            log::warn!(
                "Duplicate key ({}, {}) in comparison table; only the first row is joined",
                key.nuc_ix,
                key.name
            );
            continue;
        }
        comparison_rows.insert(key, j);
    }

    let mut matched: HashSet<usize> = HashSet::with_capacity(comparison.num_rows());
    let mut rows = Vec::with_capacity(reference.num_rows().max(comparison.num_rows()));

    for (i, key) in reference.keys().enumerate() {
        let partner = comparison_rows
            .get(&key)
            .copied()
            .filter(|j| !matched.contains(j));
        if let Some(j) = partner {
            matched.insert(j);
        }
        rows.push(JoinedRow {
            reference: Some(i),
            comparison: partner,
        });
    }

    rows.extend(
        (0..comparison.num_rows())
            .filter(|j| !matched.contains(j))
            .map(|j| JoinedRow {
                reference: None,
                comparison: Some(j),
            }),
    );
    rows
}
