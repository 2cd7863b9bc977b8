// In: src/source.rs

//! An in-memory `DatasetSource`, plus the loader that turns stored extracted
//! rows back into a comparison `Table`.
//!
//! Stored rows have the layout produced by `codec::encode_row`: three leading
//! fields `(record_id, nuc_ix, name)`, then either the literal middle steps and
//! the last step, or the last step followed by a middle-step blob.

use hashbrown::HashMap;
use rust_decimal::Decimal;

use crate::bridge::decimal_from_f64;
use crate::codec::row::{decode_row, step_field_name, LEADING_FIELDS};
use crate::codec::RowValue;
use crate::error::NucdiffError;
use crate::traits::DatasetSource;
use crate::types::{Column, DataFile, PhysicalQuantity, RowKey, Table};

/// Serves pre-loaded tables keyed by `(file id, quantity id)`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    files: Vec<DataFile>,
    quantities: Vec<PhysicalQuantity>,
    tables: HashMap<(i64, i64), Table>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file, returning the existing entry if the name is known.
    pub fn add_file(&mut self, name: &str) -> DataFile {
        if let Some(file) = self.files.iter().find(|f| f.name == name) {
            return file.clone();
        }
        let file = DataFile {
            id: self.files.len() as i64 + 1,
            name: name.to_string(),
        };
        self.files.push(file.clone());
        file
    }

    /// Registers a physical quantity, returning the existing entry if the name is known.
    pub fn add_quantity(&mut self, name: &str) -> PhysicalQuantity {
        if let Some(quantity) = self.quantities.iter().find(|q| q.name == name) {
            return quantity.clone();
        }
        let quantity = PhysicalQuantity {
            id: self.quantities.len() as i64 + 1,
            name: name.to_string(),
        };
        self.quantities.push(quantity.clone());
        quantity
    }

    /// Stores the full (all-step) table for one file and quantity.
    pub fn insert_table(&mut self, file: &DataFile, quantity: &PhysicalQuantity, table: Table) {
        self.tables.insert((file.id, quantity.id), table);
    }

    /// Rebuilds a table from stored rows and stores it under `file` and `quantity`.
    pub fn insert_stored_rows(
        &mut self,
        file: &DataFile,
        quantity: &PhysicalQuantity,
        rows: &[Vec<RowValue>],
    ) -> Result<(), NucdiffError> {
        let table = table_from_stored_rows(&file.name, rows)?;
        self.insert_table(file, quantity, table);
        Ok(())
    }
}

impl DatasetSource for InMemorySource {
    fn file_by_name(&self, name: &str) -> Result<DataFile, NucdiffError> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| NucdiffError::SourceError(format!("Unknown file '{}'", name)))
    }

    fn physical_quantity_by_name(&self, name: &str) -> Result<PhysicalQuantity, NucdiffError> {
        self.quantities
            .iter()
            .find(|q| q.name == name)
            .cloned()
            .ok_or_else(|| {
                NucdiffError::SourceError(format!("Unknown physical quantity '{}'", name))
            })
    }

    fn all_physical_quantities(&self) -> Result<Vec<PhysicalQuantity>, NucdiffError> {
        Ok(self.quantities.clone())
    }

    fn fetch_table(
        &self,
        file: &DataFile,
        quantity: &PhysicalQuantity,
        is_all_step: bool,
    ) -> Result<Table, NucdiffError> {
        let Some(table) = self.tables.get(&(file.id, quantity.id)) else {
            return Ok(Table::default());
        };
        if is_all_step {
            return Ok(table.clone());
        }

        // Only the final step column.
        let keys = table.keys().collect();
        let mut last_step_only = Table::new(keys);
        if let Some(last) = table.columns().last() {
            last_step_only.push_column(last.clone())?;
        }
        Ok(last_step_only)
    }
}

//==================================================================================
// Stored Row Loading
//==================================================================================

fn last_step_column_name(label: &str) -> String {
    format!("{}_last_step", label)
}

fn cell_to_decimal(value: &RowValue, position: usize) -> Result<Option<Decimal>, NucdiffError> {
    match value {
        RowValue::Null => Ok(None),
        RowValue::Integer(v) => Ok(Some(Decimal::from(*v))),
        RowValue::Float(v) => Ok(decimal_from_f64(*v)),
        other => Err(NucdiffError::SchemaError(format!(
            "Expected a numeric step value at position {}, found {:?}",
            position, other
        ))),
    }
}

fn row_key(row: &[RowValue]) -> Result<RowKey, NucdiffError> {
    match row {
        [_, RowValue::Integer(nuc_ix), RowValue::Text(name), ..] => Ok(RowKey::new(*nuc_ix, name.clone())),
        _ => Err(NucdiffError::SchemaError(format!(
            "Stored row must start with (record_id, nuc_ix, name), found {:?}",
            row.iter().take(LEADING_FIELDS).collect::<Vec<_>>()
        ))),
    }
}

/// Reassembles a `Table` from stored rows.
///
/// Middle steps become `{label}_middle_step_{id}` columns in id order, keyed on
/// the id stored with each step, and the last step becomes `{label}_last_step`,
/// always the final column. Rows with fewer recorded steps than others get
/// missing cells, as do values outside the decimal range.
pub fn table_from_stored_rows(label: &str, rows: &[Vec<RowValue>]) -> Result<Table, NucdiffError> {
    let mut keys = Vec::with_capacity(rows.len());
    let mut last_step = Vec::with_capacity(rows.len());
    let mut steps: Vec<Vec<(u32, Option<Decimal>)>> = Vec::with_capacity(rows.len());

    for row in rows {
        if row.len() <= LEADING_FIELDS {
            return Err(NucdiffError::SchemaError(format!(
                "Stored row has {} field(s), expected at least {}",
                row.len(),
                LEADING_FIELDS + 1
            )));
        }
        keys.push(row_key(row)?);

        let row_steps: Vec<(u32, Option<Decimal>)> = match row.last() {
            Some(RowValue::Blob(blob)) => {
                last_step.push(cell_to_decimal(&row[row.len() - 2], row.len() - 2)?);
                // The absent sentinel carries no steps.
                decode_row(Some(blob))?.to_decimals()
            }
            _ => {
                let last_idx = row.len() - 1;
                last_step.push(cell_to_decimal(&row[last_idx], last_idx)?);
                row[LEADING_FIELDS..last_idx]
                    .iter()
                    .enumerate()
                    .map(|(i, value)| Ok((i as u32 + 1, cell_to_decimal(value, LEADING_FIELDS + i)?)))
                    .collect::<Result<Vec<_>, NucdiffError>>()?
            }
        };
        steps.push(row_steps);
    }

    let max_steps = steps
        .iter()
        .flat_map(|row| row.iter().map(|(id, _)| *id))
        .max()
        .unwrap_or(0);

    let mut table = Table::new(keys);
    for id in 1..=max_steps {
        let values = steps
            .iter()
            .map(|row| row.iter().find(|(step, _)| *step == id).and_then(|(_, v)| *v))
            .collect();
        let name = format!("{}_{}", label, step_field_name(id));
        table.push_column(Column::new(name, values))?;
    }
    table.push_column(Column::new(last_step_column_name(label), last_step))?;
    Ok(table)
}
