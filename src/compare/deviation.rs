// In: src/compare/deviation.rs

//! Per-cell deviation between aligned reference and comparison columns, and the
//! row mask that keeps only significant rows.
//!
//! All arithmetic is exact (`rust_decimal`). A missing cell is unordered: any
//! subtraction, `min` or division that touches one yields a missing result for
//! that cell only. The same holds for `0 / 0`. A result outside the decimal
//! range is also missing and logged as a warning. A non-zero value over a zero
//! denominator is a real error.

use rust_decimal::Decimal;

use crate::config::DeviationMode;
use crate::error::NucdiffError;
use crate::types::{Column, Table};

pub const MIDDLE_STEP_DEVIATION_PREFIX: &str = "relative_deviation_middle_step_";
/// Name given to the deviation column when it is the only one that survives.
pub const LAST_STEP_DEVIATION_COLUMN: &str = "relative_deviation_last_step";

//==================================================================================
// 1. Result Types
//==================================================================================

/// One boolean per compared row: true iff the row's deviation strictly exceeds
/// the threshold in at least one deviation column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReservedIndex(Vec<bool>);

impl ReservedIndex {
    pub fn new(mask: Vec<bool>) -> Self {
        Self(mask)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn retained_count(&self) -> usize {
        self.0.iter().filter(|&&keep| keep).count()
    }
}

/// Deviation columns, positionally aligned with the retained rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviationTable {
    columns: Vec<Column>,
    num_rows: usize,
}

impl DeviationTable {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

//==================================================================================
// 2. Missing-Aware Cell Arithmetic
//==================================================================================

/// `min` over values where a missing operand makes the pair unordered.
fn min_unordered(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    Some(a?.min(b?))
}

fn cell_deviation(
    reference: Option<Decimal>,
    comparison: Option<Decimal>,
    mode: DeviationMode,
    column: &str,
    row: usize,
) -> Result<Option<Decimal>, NucdiffError> {
    let overflow = || {
        log::warn!(
            "Deviation in column '{}' at row {} is outside the decimal range; treating it as missing",
            column,
            row
        );
    };

    let difference = match (reference, comparison) {
        (Some(r), Some(c)) => match r.checked_sub(c) {
            Some(d) => d.abs(),
            None => {
                overflow();
                return Ok(None);
            }
        },
        _ => return Ok(None),
    };

    match mode {
        DeviationMode::Absolute => Ok(Some(difference)),
        DeviationMode::Relative => {
            let Some(smaller) = min_unordered(reference, comparison) else {
                return Ok(None);
            };
            let Some(denominator) = Decimal::ONE.checked_add(smaller) else {
                overflow();
                return Ok(None);
            };
            if denominator.is_zero() {
                if difference.is_zero() {
                    return Ok(None);
                }
                return Err(NucdiffError::DivisionByZero {
                    column: column.to_string(),
                    row,
                });
            }
            let quotient = difference.checked_div(denominator);
            if quotient.is_none() {
                overflow();
            }
            Ok(quotient)
        }
    }
}

//==================================================================================
// 3. Public API
//==================================================================================

/// Computes the deviation table and reserved-index mask for two aligned tables.
///
/// Rows are compared positionally; when one table is shorter its missing rows
/// count as missing cells. Deviation columns that are missing everywhere are
/// dropped, and a single surviving column is renamed to
/// `LAST_STEP_DEVIATION_COLUMN`. Rows whose deviations never strictly exceed
/// `threshold` are removed from the returned table and marked `false` in the mask.
pub fn compute(
    reference: &Table,
    comparison: &Table,
    mode: DeviationMode,
    threshold: Decimal,
) -> Result<(DeviationTable, ReservedIndex), NucdiffError> {
    if reference.width() != comparison.width() {
        return Err(NucdiffError::SchemaError(format!(
            "Tables must be aligned before computing deviations: widths {} and {}",
            reference.width(),
            comparison.width()
        )));
    }

    let num_rows = reference.num_rows().max(comparison.num_rows());
    let mut columns = Vec::new();

    for (step, (ref_col, cmp_col)) in reference
        .columns()
        .iter()
        .zip(comparison.columns())
        .enumerate()
    {
        let values = (0..num_rows)
            .map(|row| cell_deviation(ref_col.get(row), cmp_col.get(row), mode, &ref_col.name, row))
            .collect::<Result<Vec<_>, _>>()?;

        let column = Column::new(format!("{}{}", MIDDLE_STEP_DEVIATION_PREFIX, step), values);
        if column.is_all_missing() {
            log::debug!(
                "Dropping all-missing deviation for '{}' vs '{}'",
                ref_col.name,
                cmp_col.name
            );
            continue;
        }
        columns.push(column);
    }

    if let [only] = columns.as_mut_slice() {
        only.name = LAST_STEP_DEVIATION_COLUMN.to_string();
    }

    let mask: Vec<bool> = (0..num_rows)
        .map(|row| {
            columns
                .iter()
                .any(|c| c.get(row).is_some_and(|d| d > threshold))
        })
        .collect();

    for column in &mut columns {
        column.values = column
            .values
            .iter()
            .zip(&mask)
            .filter(|&(_, &keep)| keep)
            .map(|(value, _)| *value)
            .collect();
    }

    let reserved_index = ReservedIndex::new(mask);
    log::debug!(
        "{} deviation: {} column(s) kept, {}/{} row(s) above {}",
        mode,
        columns.len(),
        reserved_index.retained_count(),
        num_rows,
        threshold
    );

    let deviation = DeviationTable {
        columns,
        num_rows: reserved_index.retained_count(),
    };
    Ok((deviation, reserved_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowKey;
    use std::str::FromStr;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    fn one_column(values: Vec<Option<Decimal>>) -> Table {
        let keys = (0..values.len())
            .map(|i| RowKey::new(i as i64, format!("N{}", i)))
            .collect();
        Table::new(keys)
            .with_column(Column::new("last_step", values))
            .unwrap()
    }

    fn threshold() -> Decimal {
        crate::config::default_threshold()
    }

    #[test]
    fn test_relative_formula() {
        let (dev, mask) = compute(
            &one_column(vec![dec("10"), dec("0"), dec("5")]),
            &one_column(vec![dec("9"), dec("0"), dec("2")]),
            DeviationMode::Relative,
            threshold(),
        )
        .unwrap();

        // 10 vs 9 -> 1/10; 0 vs 0 -> 0 (dropped); 5 vs 2 -> 3/3
        assert_eq!(mask.as_slice(), &[true, false, true]);
        let column = dev.column(LAST_STEP_DEVIATION_COLUMN).unwrap();
        assert_eq!(column.values, vec![dec("0.1"), dec("1")]);
        assert_eq!(dev.num_rows(), 2);
    }

    #[test]
    fn test_absolute_formula() {
        let (dev, _) = compute(
            &one_column(vec![dec("5")]),
            &one_column(vec![dec("2")]),
            DeviationMode::Absolute,
            threshold(),
        )
        .unwrap();
        assert_eq!(dev.columns()[0].values, vec![dec("3")]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let exactly = dec("0.000000000001");
        let (dev, mask) = compute(
            &one_column(vec![exactly, dec("0.0000000000011")]),
            &one_column(vec![dec("0"), dec("0")]),
            DeviationMode::Absolute,
            threshold(),
        )
        .unwrap();
        assert_eq!(mask.as_slice(), &[false, true]);
        assert_eq!(dev.num_rows(), 1);
    }

    #[test]
    fn test_missing_values_propagate_per_cell() {
        let (dev, mask) = compute(
            &one_column(vec![None, dec("2"), dec("4")]),
            &one_column(vec![dec("1"), None, dec("1")]),
            DeviationMode::Relative,
            threshold(),
        )
        .unwrap();
        assert_eq!(mask.as_slice(), &[false, false, true]);
        assert_eq!(dev.columns()[0].values, vec![dec("1.5")]);
    }

    #[test]
    fn test_zero_over_zero_is_missing() {
        let (dev, mask) = compute(
            &one_column(vec![dec("-1")]),
            &one_column(vec![dec("-1")]),
            DeviationMode::Relative,
            threshold(),
        )
        .unwrap();
        assert_eq!(dev.width(), 0);
        assert_eq!(mask.as_slice(), &[false]);
    }

    #[test]
    fn test_nonzero_over_zero_is_an_error() {
        let err = compute(
            &one_column(vec![dec("-1")]),
            &one_column(vec![dec("3")]),
            DeviationMode::Relative,
            threshold(),
        )
        .unwrap_err();
        assert!(matches!(err, NucdiffError::DivisionByZero { row: 0, .. }));
    }

    #[test]
    fn test_out_of_range_deviation_is_missing() {
        let (dev, mask) = compute(
            &one_column(vec![Some(Decimal::MAX), dec("3")]),
            &one_column(vec![Some(Decimal::MIN), dec("1")]),
            DeviationMode::Absolute,
            threshold(),
        )
        .unwrap();
        // MAX - MIN does not fit; the other row is unaffected.
        assert_eq!(mask.as_slice(), &[false, true]);
        assert_eq!(dev.columns()[0].values, vec![dec("2")]);

        // 1 + MAX overflows the relative denominator.
        let (_, mask) = compute(
            &one_column(vec![Some(Decimal::MAX)]),
            &one_column(vec![Some(Decimal::MAX)]),
            DeviationMode::Relative,
            threshold(),
        )
        .unwrap();
        assert_eq!(mask.as_slice(), &[false]);
    }

    #[test]
    fn test_multiple_columns_keep_indexed_names() {
        let keys = vec![RowKey::new(1, "U235"), RowKey::new(2, "U238")];
        let reference = Table::new(keys.clone())
            .with_column(Column::new("a_middle_step_1", vec![dec("1"), dec("1")]))
            .unwrap()
            .with_column(Column::missing("a_middle_step_2", 2))
            .unwrap()
            .with_column(Column::new("a_last_step", vec![dec("2"), dec("2")]))
            .unwrap();
        let comparison = Table::new(keys)
            .with_column(Column::new("b_middle_step_1", vec![dec("1"), dec("3")]))
            .unwrap()
            .with_column(Column::new("b_middle_step_2", vec![dec("1"), dec("1")]))
            .unwrap()
            .with_column(Column::new("b_last_step", vec![dec("2"), dec("2")]))
            .unwrap();

        let (dev, mask) = compute(&reference, &comparison, DeviationMode::Absolute, threshold()).unwrap();
        let names: Vec<&str> = dev.columns().iter().map(|c| c.name.as_str()).collect();
        // The padded pair (step index 1) is all-missing and dropped.
        assert_eq!(
            names,
            vec!["relative_deviation_middle_step_0", "relative_deviation_middle_step_2"]
        );
        assert_eq!(mask.as_slice(), &[false, true]);
        assert_eq!(dev.columns()[0].values, vec![dec("2")]);
    }

    #[test]
    fn test_unaligned_tables_rejected() {
        let reference = one_column(vec![dec("1")]);
        let comparison = Table::new(vec![RowKey::new(0, "N0")]);
        assert!(matches!(
            compute(&reference, &comparison, DeviationMode::Relative, threshold()),
            Err(NucdiffError::SchemaError(_))
        ));
    }

    #[test]
    fn test_shorter_side_counts_as_missing() {
        let (dev, mask) = compute(
            &one_column(vec![dec("1"), dec("7")]),
            &one_column(vec![dec("2")]),
            DeviationMode::Absolute,
            threshold(),
        )
        .unwrap();
        assert_eq!(mask.as_slice(), &[true, false]);
        assert_eq!(dev.columns()[0].values, vec![dec("1")]);
    }
}
