// In: src/report/xlsx.rs

//! Writes a `ComparisonReport` as an xlsx workbook with one worksheet per
//! physical quantity.

use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use super::{report_path, ComparisonReport};
use crate::bridge::decimal_to_f64;
use crate::error::NucdiffError;
use crate::types::Table;

/// Saves `report` to `{dir}/{reference}/{file name}` and returns that path.
///
/// The reference sub-directory is created if needed and an existing workbook
/// at the path is removed first. An empty report removes the old workbook and
/// writes nothing.
pub fn save_to_xlsx(
    report: &ComparisonReport,
    dir: &Path,
    reference: &str,
    comparison: &str,
    is_all_step: bool,
) -> Result<PathBuf, NucdiffError> {
    let path = report_path(dir, reference, comparison, is_all_step);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        log::debug!("Replacing existing report {}", path.display());
        fs::remove_file(&path)?;
    }

    if report.is_empty() {
        log::warn!(
            "No quantity produced a result for {} vs {}; nothing written",
            reference,
            comparison
        );
        return Ok(path);
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for (quantity, table) in report.sections() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(quantity)?;
        write_table(sheet, table, &header_format)?;
    }

    workbook.save(&path)?;
    log::info!(
        "Saved {} sheet(s) to {}",
        report.len(),
        path.display()
    );
    Ok(path)
}

fn column_index(index: usize) -> Result<u16, NucdiffError> {
    u16::try_from(index).map_err(|_| {
        NucdiffError::UnsupportedType(format!("Column index {} exceeds the worksheet limit", index))
    })
}

fn row_index(index: usize) -> Result<u32, NucdiffError> {
    u32::try_from(index).map_err(|_| {
        NucdiffError::UnsupportedType(format!("Row index {} exceeds the worksheet limit", index))
    })
}

fn write_table(sheet: &mut Worksheet, table: &Table, header: &Format) -> Result<(), NucdiffError> {
    for (col, name) in table.column_names().into_iter().enumerate() {
        sheet.write_string_with_format(0, column_index(col)?, name, header)?;
    }

    for (i, (nuc_ix, name)) in table.nuc_ix().iter().zip(table.names()).enumerate() {
        let row = row_index(i + 1)?;
        sheet.write_number(row, 0, *nuc_ix as f64)?;
        sheet.write_string(row, 1, name)?;
    }

    for (offset, column) in table.columns().iter().enumerate() {
        let col = column_index(offset + 2)?;
        for (i, value) in column.values.iter().enumerate() {
            // Missing cells stay blank.
            if let Some(value) = value {
                sheet.write_number(row_index(i + 1)?, col, decimal_to_f64(*value)?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, RowKey};
    use rust_decimal::Decimal;

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nucdiff_{}_{}", test, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_report(is_all_step: bool) -> ComparisonReport {
        let table = Table::new(vec![RowKey::new(1, "U235"), RowKey::new(2, "U238")])
            .with_column(Column::new(
                "relative_deviation_last_step",
                vec![Some(Decimal::new(1, 1)), None],
            ))
            .unwrap();
        let mut report = ComparisonReport::new("001", "002", is_all_step);
        report.insert("isotope", table);
        report
    }

    #[test]
    fn test_workbook_written_under_reference_dir() {
        let dir = scratch_dir("write");
        let path = sample_report(false).save(&dir).unwrap();

        assert_eq!(path, dir.join("001").join("001_vs_002.xlsx"));
        let bytes = fs::read(&path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_existing_workbook_is_replaced() {
        let dir = scratch_dir("replace");
        let path = report_path(&dir, "001", "002", true);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"stale").unwrap();

        let saved = sample_report(true).save(&dir).unwrap();
        assert_eq!(saved, path);
        assert_eq!(&fs::read(&path).unwrap()[..2], b"PK");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_report_removes_old_file() {
        let dir = scratch_dir("empty");
        let path = report_path(&dir, "001", "002", false);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"stale").unwrap();

        let report = ComparisonReport::new("001", "002", false);
        save_to_xlsx(&report, &dir, "001", "002", false).unwrap();
        assert!(!path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
