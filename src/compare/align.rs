//! Column alignment: pads the narrower of two tables with all-missing step
//! columns so both sides have the same column cardinality.

use crate::error::NucdiffError;
use crate::types::{Column, Table, KEY_COLUMN_COUNT};

/// Name of a padding (or real) intermediate-step column for a source label.
pub fn middle_step_column_name(label: &str, step: usize) -> String {
    format!("{}_middle_step_{}", label, step)
}

/// Equalizes the widths of `reference` and `comparison`.
///
/// The narrower table receives `|width(ref) - width(cmp)|` missing columns named
/// `{label}_middle_step_{k}`, with `k` counting up from `min(widths) - 2`. Equal
/// widths are returned untouched.
pub fn align(
    reference: Table,
    comparison: Table,
    reference_label: &str,
    comparison_label: &str,
) -> Result<(Table, Table), NucdiffError> {
    let reference_width = reference.width();
    let comparison_width = comparison.width();
    let start = reference_width.min(comparison_width) - KEY_COLUMN_COUNT;
    let missing = reference_width.abs_diff(comparison_width);

    match reference_width.cmp(&comparison_width) {
        std::cmp::Ordering::Equal => Ok((reference, comparison)),
        std::cmp::Ordering::Less => {
            log::debug!(
                "Padding reference '{}' with {} column(s) from step {}",
                reference_label,
                missing,
                start
            );
            Ok((pad(reference, reference_label, start, missing)?, comparison))
        }
        std::cmp::Ordering::Greater => {
            log::debug!(
                "Padding comparison '{}' with {} column(s) from step {}",
                comparison_label,
                missing,
                start
            );
            Ok((reference, pad(comparison, comparison_label, start, missing)?))
        }
    }
}

fn pad(mut table: Table, label: &str, start: usize, count: usize) -> Result<Table, NucdiffError> {
    let rows = table.num_rows();
    for step in start..start + count {
        table.push_column(Column::missing(middle_step_column_name(label, step), rows))?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowKey;
    use rust_decimal::Decimal;

    fn table(label: &str, steps: usize) -> Table {
        let mut table = Table::new(vec![RowKey::new(1, "U235"), RowKey::new(2, "U238")]);
        for step in 1..steps {
            table
                .push_column(Column::new(
                    middle_step_column_name(label, step),
                    vec![Some(Decimal::from(step as i64)); 2],
                ))
                .unwrap();
        }
        table
            .push_column(Column::new(format!("{}_last_step", label), vec![Some(Decimal::ONE); 2]))
            .unwrap();
        table
    }

    #[test]
    fn test_equal_widths_untouched() {
        let (r, c) = align(table("001", 3), table("002", 3), "001", "002").unwrap();
        assert_eq!(r, table("001", 3));
        assert_eq!(c, table("002", 3));
    }

    #[test]
    fn test_reference_padded_when_narrower() {
        // reference: keys + step_1 + last = 4, comparison: keys + steps 1..=3 + last = 6
        let (r, c) = align(table("001", 2), table("002", 4), "001", "002").unwrap();
        assert_eq!(r.width(), 6);
        assert_eq!(c.width(), 6);
        assert_eq!(
            r.column_names()[4..],
            ["001_middle_step_2", "001_middle_step_3"]
        );
        assert!(r.columns()[2].is_all_missing());
        assert!(r.columns()[3].is_all_missing());
        assert_eq!(r.columns()[2].len(), 2);
    }

    #[test]
    fn test_comparison_padded_when_narrower() {
        let (r, c) = align(table("001", 4), table("002", 1), "001", "002").unwrap();
        assert_eq!(r.width(), 6);
        assert_eq!(c.width(), 6);
        assert_eq!(
            c.column_names()[3..],
            ["002_middle_step_1", "002_middle_step_2", "002_middle_step_3"]
        );
    }

    #[test]
    fn test_width_is_max_in_both_orders() {
        for (m, n) in [(1, 1), (1, 5), (5, 1), (3, 7)] {
            let (a, b) = align(table("a", m), table("b", n), "a", "b").unwrap();
            let (b2, a2) = align(table("b", n), table("a", m), "b", "a").unwrap();
            let expected = KEY_COLUMN_COUNT + m.max(n);
            for t in [&a, &b, &a2, &b2] {
                assert_eq!(t.width(), expected);
            }
        }
    }
}
