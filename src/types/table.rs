//! The in-memory table every comparison stage reads and produces.
//!
//! A `Table` is keyed by `(nuc_ix, name)` and carries an ordered list of
//! decimal value columns. The two key columns count toward `width()`, matching
//! the tabular input contract where they are the first two columns.

use rust_decimal::Decimal;

use crate::error::NucdiffError;

pub const NUC_IX_COLUMN: &str = "nuc_ix";
pub const NAME_COLUMN: &str = "name";
/// Number of leading key columns in every table.
pub const KEY_COLUMN_COUNT: usize = 2;

/// The composite row key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub nuc_ix: i64,
    pub name: String,
}

impl RowKey {
    pub fn new(nuc_ix: i64, name: impl Into<String>) -> Self {
        Self {
            nuc_ix,
            name: name.into(),
        }
    }
}

/// A named column of optional decimals; `None` is a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<Decimal>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<Decimal>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// A column of `len` missing cells.
    pub fn missing(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, vec![None; len])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no cell holds a value (vacuously true for an empty column).
    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    pub fn get(&self, row: usize) -> Option<Decimal> {
        self.values.get(row).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    nuc_ix: Vec<i64>,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Creates a table with the given keys and no value columns.
    pub fn new(keys: Vec<RowKey>) -> Self {
        let (nuc_ix, names): (Vec<i64>, Vec<String>) = keys.into_iter().map(|k| (k.nuc_ix, k.name)).unzip();
        Self {
            nuc_ix,
            names,
            columns: Vec::new(),
        }
    }

    /// Assembles a table from key vectors and value columns, validating shape.
    pub fn from_parts(
        nuc_ix: Vec<i64>,
        names: Vec<String>,
        columns: Vec<Column>,
    ) -> Result<Self, NucdiffError> {
        if nuc_ix.len() != names.len() {
            return Err(NucdiffError::SchemaError(format!(
                "Key columns differ in length: {} '{}' values, {} '{}' values",
                nuc_ix.len(),
                NUC_IX_COLUMN,
                names.len(),
                NAME_COLUMN
            )));
        }
        let mut table = Self {
            nuc_ix,
            names,
            columns: Vec::with_capacity(columns.len()),
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Appends a value column. Its length must equal the row count and its
    /// name must not already be in use.
    pub fn push_column(&mut self, column: Column) -> Result<(), NucdiffError> {
        if column.len() != self.num_rows() {
            return Err(NucdiffError::SchemaError(format!(
                "Column '{}' has {} rows, table has {}",
                column.name,
                column.len(),
                self.num_rows()
            )));
        }
        if column.name == NUC_IX_COLUMN
            || column.name == NAME_COLUMN
            || self.column(&column.name).is_some()
        {
            return Err(NucdiffError::SchemaError(format!(
                "Duplicate column name '{}'",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn with_column(mut self, column: Column) -> Result<Self, NucdiffError> {
        self.push_column(column)?;
        Ok(self)
    }

    pub fn num_rows(&self) -> usize {
        self.nuc_ix.len()
    }

    /// Column cardinality including the two key columns.
    pub fn width(&self) -> usize {
        KEY_COLUMN_COUNT + self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All column names in order, keys first.
    pub fn column_names(&self) -> Vec<&str> {
        [NUC_IX_COLUMN, NAME_COLUMN]
            .into_iter()
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn nuc_ix(&self) -> &[i64] {
        &self.nuc_ix
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn key(&self, row: usize) -> Option<RowKey> {
        Some(RowKey::new(*self.nuc_ix.get(row)?, self.names.get(row)?.clone()))
    }

    pub fn keys(&self) -> impl Iterator<Item = RowKey> + '_ {
        self.nuc_ix
            .iter()
            .zip(&self.names)
            .map(|(&nuc_ix, name)| RowKey::new(nuc_ix, name.clone()))
    }

    /// Keeps row `i` iff `mask[i]` is true; rows past the end of `mask` are dropped.
    pub fn filter_rows(&self, mask: &[bool]) -> Table {
        let keep: Vec<usize> = (0..self.num_rows())
            .filter(|&i| mask.get(i).copied().unwrap_or(false))
            .collect();
        self.take_rows(&keep)
    }

    /// Returns a copy with rows ordered by `(nuc_ix, name)`. The sort is stable.
    pub fn sort_by_key(&self) -> Table {
        let mut order: Vec<usize> = (0..self.num_rows()).collect();
        order.sort_by(|&a, &b| {
            (self.nuc_ix[a], &self.names[a]).cmp(&(self.nuc_ix[b], &self.names[b]))
        });
        self.take_rows(&order)
    }

    /// Removes every value column that holds no value at all.
    pub fn drop_all_missing_columns(&mut self) {
        self.columns.retain(|c| !c.is_all_missing());
    }

    fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            nuc_ix: indices.iter().map(|&i| self.nuc_ix[i]).collect(),
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }
}
