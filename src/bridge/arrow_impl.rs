// In: src/bridge/arrow_impl.rs

//! Marshalling between Arrow `RecordBatch`es and the pure, Arrow-agnostic `Table`.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Decimal128Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Decimal128Type, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use rust_decimal::Decimal;

use super::decimal::decimal_from_f64;
use crate::config::parse_decimal;
use crate::error::NucdiffError;
use crate::types::{Column, Table, KEY_COLUMN_COUNT, NAME_COLUMN, NUC_IX_COLUMN};

/// Precision of every decimal column written back to Arrow.
const OUTPUT_PRECISION: u8 = 38;
/// Finest scale `rust_decimal` can hold.
const MAX_DECIMAL_SCALE: u32 = 28;

//==================================================================================
// 1. Arrow -> Table
//==================================================================================

/// Converts a batch whose first two columns are `nuc_ix` and `name` into a `Table`.
pub fn table_from_record_batch(batch: &RecordBatch) -> Result<Table, NucdiffError> {
    let schema = batch.schema();
    if schema.fields().len() < KEY_COLUMN_COUNT
        || schema.field(0).name() != NUC_IX_COLUMN
        || schema.field(1).name() != NAME_COLUMN
    {
        return Err(NucdiffError::SchemaError(format!(
            "Expected leading key columns '{}' and '{}', found {:?}",
            NUC_IX_COLUMN,
            NAME_COLUMN,
            schema.fields().iter().map(|f| f.name()).collect::<Vec<_>>()
        )));
    }

    let nuc_ix_array = cast(batch.column(0), &DataType::Int64)?;
    let nuc_ix_array = nuc_ix_array.as_primitive::<Int64Type>();
    let name_array = cast(batch.column(1), &DataType::Utf8)?;
    let name_array = name_array.as_string::<i32>();
    if nuc_ix_array.null_count() > 0 || name_array.null_count() > 0 {
        return Err(NucdiffError::SchemaError(
            "Key columns must not contain nulls".to_string(),
        ));
    }

    let nuc_ix: Vec<i64> = nuc_ix_array.values().to_vec();
    let names: Vec<String> = name_array.iter().map(|v| v.unwrap_or_default().to_string()).collect();

    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .skip(KEY_COLUMN_COUNT)
        .map(|(field, array)| {
            Ok(Column::new(field.name().clone(), array_to_decimals(array.as_ref())?))
        })
        .collect::<Result<Vec<_>, NucdiffError>>()?;

    Table::from_parts(nuc_ix, names, columns)
}

fn array_to_decimals(array: &dyn Array) -> Result<Vec<Option<Decimal>>, NucdiffError> {
    match array.data_type() {
        DataType::Null => Ok(vec![None; array.len()]),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let floats = cast(array, &DataType::Float64)?;
            Ok(floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.and_then(decimal_from_f64))
                .collect())
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let ints = cast(array, &DataType::Int64)?;
            Ok(ints
                .as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.map(Decimal::from))
                .collect())
        }
        DataType::Decimal128(_, scale) => {
            let scale = *scale;
            Ok(array
                .as_primitive::<Decimal128Type>()
                .iter()
                .map(|v| v.and_then(|raw| decimal_from_i128(raw, scale)))
                .collect())
        }
        DataType::Utf8 | DataType::LargeUtf8 => {
            let strings = cast(array, &DataType::Utf8)?;
            strings
                .as_string::<i32>()
                .iter()
                .map(|v| match v.map(str::trim) {
                    Some(s) if !s.is_empty() => parse_decimal(s).map(Some),
                    _ => Ok(None),
                })
                .collect()
        }
        other => Err(NucdiffError::UnsupportedType(format!(
            "Cannot read value column of Arrow type {:?}",
            other
        ))),
    }
}

/// Reads one raw `Decimal128` cell. Fractions finer than `MAX_DECIMAL_SCALE`
/// are rounded; magnitudes beyond the decimal range become missing cells.
fn decimal_from_i128(raw: i128, scale: i8) -> Option<Decimal> {
    let decimal = if scale >= 0 {
        let excess = (scale as u32).saturating_sub(MAX_DECIMAL_SCALE);
        10i128.checked_pow(excess).and_then(|factor| {
            let (quotient, remainder) = (raw / factor, raw % factor);
            let rounded = if remainder.unsigned_abs() * 2 >= factor.unsigned_abs() {
                quotient + raw.signum()
            } else {
                quotient
            };
            Decimal::try_from_i128_with_scale(rounded, scale as u32 - excess).ok()
        })
    } else {
        10i128
            .checked_pow(scale.unsigned_abs() as u32)
            .and_then(|f| raw.checked_mul(f))
            .and_then(|v| Decimal::try_from_i128_with_scale(v, 0).ok())
    };
    if decimal.is_none() {
        log::warn!(
            "{}e{} is outside the decimal range; treating it as missing",
            raw,
            -(scale as i32)
        );
    }
    decimal
}

//==================================================================================
// 2. Table -> Arrow
//==================================================================================

/// Converts a `Table` into a batch of `nuc_ix: Int64`, `name: Utf8` and one
/// `Decimal128(38, s)` column per value column. `s` is the largest scale found
/// in that column, lowered when needed so its largest magnitude still fits.
pub fn table_to_record_batch(table: &Table) -> Result<RecordBatch, NucdiffError> {
    let mut fields = vec![
        Field::new(NUC_IX_COLUMN, DataType::Int64, false),
        Field::new(NAME_COLUMN, DataType::Utf8, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(table.nuc_ix().to_vec())),
        Arc::new(StringArray::from_iter_values(table.names().iter())),
    ];

    for column in table.columns() {
        let (array, scale) = decimals_to_array(column)?;
        fields.push(Field::new(
            column.name.clone(),
            DataType::Decimal128(OUTPUT_PRECISION, scale),
            true,
        ));
        arrays.push(Arc::new(array));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Digits left of the decimal point, ignoring sign. Zero for `|d| < 1`.
fn integer_digits(d: Decimal) -> u32 {
    let whole = d.abs().trunc().normalize();
    whole
        .mantissa()
        .unsigned_abs()
        .checked_ilog10()
        .map_or(0, |digits| digits + 1)
}

fn decimals_to_array(column: &Column) -> Result<(Decimal128Array, i8), NucdiffError> {
    let present = || column.values.iter().flatten();
    let max_scale = present().map(|d| d.scale()).max().unwrap_or(0);
    let max_integer_digits = present().map(|d| integer_digits(*d)).max().unwrap_or(0);
    // Large magnitudes leave fewer of the 38 digits for the fraction.
    let scale = max_scale.min((OUTPUT_PRECISION as u32).saturating_sub(max_integer_digits));
    if scale < max_scale {
        log::debug!(
            "Column '{}' rounded from scale {} to {} to fit Decimal128({}, _)",
            column.name,
            max_scale,
            scale,
            OUTPUT_PRECISION
        );
    }
    let limit = 10i128.pow(OUTPUT_PRECISION as u32);

    let raw = column
        .values
        .iter()
        .map(|value| {
            value
                .map(|d| {
                    let rounded = d.round_dp(scale);
                    10i128
                        .checked_pow(scale - rounded.scale())
                        .and_then(|f| rounded.mantissa().checked_mul(f))
                        .filter(|v| v.unsigned_abs() < limit as u128)
                        .ok_or_else(|| {
                            NucdiffError::DecimalConversion(format!(
                                "{} in column '{}' does not fit Decimal128({}, {})",
                                d, column.name, OUTPUT_PRECISION, scale
                            ))
                        })
                })
                .transpose()
        })
        .collect::<Result<Vec<Option<i128>>, _>>()?;

    let array = Decimal128Array::from(raw).with_precision_and_scale(OUTPUT_PRECISION, scale as i8)?;
    Ok((array, scale as i8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowKey;
    use arrow::array::{Float64Array, Int32Array};
    use std::str::FromStr;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    fn input_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("nuc_ix", DataType::Int32, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("ref_middle_step_0", DataType::Float64, true),
            Field::new("ref_last_step", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["U235", "U238"])),
                Arc::new(Float64Array::from(vec![Some(0.1), None])),
                Arc::new(StringArray::from(vec![Some("1.0E-12"), Some("")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_batch_to_table() {
        let table = table_from_record_batch(&input_batch()).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.width(), 4);
        assert_eq!(table.nuc_ix(), &[1, 2]);
        assert_eq!(table.columns()[0].values, vec![dec("0.1"), None]);
        assert_eq!(table.columns()[1].values, vec![Some(Decimal::new(1, 12)), None]);
    }

    #[test]
    fn test_table_roundtrip_through_decimal128() {
        let table = table_from_record_batch(&input_batch()).unwrap();
        let batch = table_to_record_batch(&table).unwrap();

        assert_eq!(
            batch.schema().field(2).data_type(),
            &DataType::Decimal128(OUTPUT_PRECISION, 1)
        );
        assert_eq!(table_from_record_batch(&batch).unwrap(), table);
    }

    #[test]
    fn test_missing_key_columns_rejected() {
        let schema = Schema::new(vec![Field::new("name", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["U235"]))],
        )
        .unwrap();
        assert!(matches!(
            table_from_record_batch(&batch),
            Err(NucdiffError::SchemaError(_))
        ));
    }

    #[test]
    fn test_negative_scale_decimal() {
        assert_eq!(decimal_from_i128(12, -2), Some(Decimal::from(1200)));
    }

    #[test]
    fn test_out_of_range_decimal128_cells_are_missing() {
        // 0.5 at scale 30 is rounded into range; 10^38 at scale 0 is not representable.
        assert_eq!(decimal_from_i128(5 * 10i128.pow(29), 30), dec("0.5"));
        assert_eq!(decimal_from_i128(-150, 30), Some(Decimal::new(-2, 28)));
        assert_eq!(decimal_from_i128(10i128.pow(37), 0), None);
    }

    #[test]
    fn test_fine_and_large_values_share_a_column() {
        let keys = vec![RowKey::new(1, "U235"), RowKey::new(2, "Pu239")];
        let tiny = Decimal::new(1, 28);
        let large = Decimal::from(10_000_000_000i64);
        let table = Table::new(keys)
            .with_column(Column::new("001_last_step", vec![Some(tiny), Some(large)]))
            .unwrap();

        let batch = table_to_record_batch(&table).unwrap();
        // 11 integer digits leave 27 for the fraction.
        assert_eq!(
            batch.schema().field(2).data_type(),
            &DataType::Decimal128(OUTPUT_PRECISION, 27)
        );
        let back = table_from_record_batch(&batch).unwrap();
        assert_eq!(back.columns()[0].values, vec![Some(Decimal::ZERO), Some(large)]);
    }
}
