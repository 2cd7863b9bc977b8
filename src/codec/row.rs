// In: src/codec/row.rs

//! Row-level adapters between raw extracted rows and the `MiddleSteps` record.
//!
//! A raw row is laid out as three leading fixed fields, any number of middle
//! step values, and one trailing field (the last-step value). Packing moves the
//! trailing field next to the leading ones and appends the encoded blob, so the
//! stored schema is `[f0, f1, f2, last, blob]` no matter how many steps a row has.

use rust_decimal::Decimal;

use super::middle_steps;
use crate::bridge::decimal_from_f64;
use crate::error::NucdiffError;

/// Rows shorter than this are stored literally and never packed.
pub const MIN_ENCODED_ROW_LEN: usize = 10;
/// Number of fixed fields ahead of the middle steps.
pub const LEADING_FIELDS: usize = 3;
/// Key emitted by `decode_row` when a row carries no middle-step payload at all.
pub const MIDDLE_STEPS_SENTINEL: &str = "middle_steps";

/// A single cell of a raw extracted row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl RowValue {
    fn as_step_value(&self, position: usize) -> Result<f64, NucdiffError> {
        match self {
            RowValue::Float(v) => Ok(*v),
            RowValue::Integer(v) => Ok(*v as f64),
            // Missing steps travel as NaN and come back as absent.
            RowValue::Null => Ok(f64::NAN),
            other => Err(NucdiffError::MiddleStepEncodeError(format!(
                "Middle step at position {} is not numeric: {:?}",
                position, other
            ))),
        }
    }
}

/// Packs the middle steps of `row` into a single blob.
///
/// Rows with fewer than `MIN_ENCODED_ROW_LEN` entries are returned unchanged.
pub fn encode_row(row: Vec<RowValue>) -> Result<Vec<RowValue>, NucdiffError> {
    if row.len() < MIN_ENCODED_ROW_LEN {
        return Ok(row);
    }

    let last_idx = row.len() - 1;
    let values = row[LEADING_FIELDS..last_idx]
        .iter()
        .enumerate()
        .map(|(offset, value)| value.as_step_value(LEADING_FIELDS + offset))
        .collect::<Result<Vec<f64>, _>>()?;
    let blob = middle_steps::encode(&values)?;

    let mut fields = row.into_iter();
    let mut packed: Vec<RowValue> = fields.by_ref().take(LEADING_FIELDS).collect();
    // `fields` now yields the steps followed by the trailing field.
    if let Some(last) = fields.last() {
        packed.push(last);
    }
    packed.push(RowValue::Blob(blob));
    Ok(packed)
}

/// Named fields expanded from one row's middle-step blob, in stream order.
///
/// `steps` is `None` for the `{"middle_steps": absent}` sentinel, which is a
/// distinct state from a blob that decodes to zero steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFields {
    steps: Option<Vec<(u32, Option<f64>)>>,
}

impl StepFields {
    /// The explicit "no middle steps" mapping: `{"middle_steps": absent}`.
    pub fn absent() -> Self {
        Self { steps: None }
    }

    /// True when this mapping is the no-payload sentinel rather than a list of
    /// recorded steps.
    pub fn is_absent(&self) -> bool {
        self.steps.is_none()
    }

    /// Looks up a field; the outer `Option` is presence of the key.
    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        match &self.steps {
            None => (name == MIDDLE_STEPS_SENTINEL).then_some(None),
            Some(steps) => steps
                .iter()
                .find(|(id, _)| step_field_name(*id) == name)
                .map(|(_, value)| *value),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.as_ref().map_or(1, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names and values, including the sentinel key when absent.
    pub fn iter(&self) -> impl Iterator<Item = (String, Option<f64>)> + '_ {
        let sentinel = self
            .is_absent()
            .then(|| (MIDDLE_STEPS_SENTINEL.to_string(), None));
        sentinel
            .into_iter()
            .chain(self.steps().map(|(id, value)| (step_field_name(id), value)))
    }

    /// The recorded `(id, value)` pairs. The sentinel has none.
    pub fn steps(&self) -> impl Iterator<Item = (u32, Option<f64>)> + '_ {
        self.steps.iter().flatten().copied()
    }

    /// Recorded steps as exact decimals for use as table cells. Values outside
    /// the decimal range become missing cells.
    pub fn to_decimals(&self) -> Vec<(u32, Option<Decimal>)> {
        self.steps()
            .map(|(id, value)| (id, value.and_then(decimal_from_f64)))
            .collect()
    }
}

pub fn step_field_name(id: u32) -> String {
    format!("middle_step_{}", id)
}

/// Expands a stored blob back into `middle_step_<id>` fields.
///
/// A missing or empty blob carries no payload and yields the
/// `{"middle_steps": absent}` sentinel rather than an empty mapping.
pub fn decode_row(blob: Option<&[u8]>) -> Result<StepFields, NucdiffError> {
    let Some(bytes) = blob.filter(|b| !b.is_empty()) else {
        return Ok(StepFields::absent());
    };

    let steps = middle_steps::decode(bytes)
        .map(|step| {
            step.map(|s| {
                let value = if s.data.is_nan() { None } else { Some(s.data) };
                (s.id, value)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StepFields { steps: Some(steps) })
}
