// In: src/codec/middle_steps.rs

//! The `MiddleSteps` binary record: an ordered list of intermediate values, each
//! tagged with its 1-based position, serialized as protobuf messages.
//!
//! ```text
//! message MiddleStep  { uint32 id = 1; double data = 2; }
//! message MiddleSteps { repeated MiddleStep middle_steps = 1; }
//! ```
//!
//! Writers follow proto3 rules and omit fields holding their default value;
//! readers default missing fields and skip fields they do not recognise, so
//! records written by newer schema revisions stay readable.

use std::io::Cursor;

use super::wire::{self, WireType};
use crate::error::NucdiffError;

const STEP_ID_FIELD: u32 = 1;
const STEP_DATA_FIELD: u32 = 2;
const STEPS_FIELD: u32 = 1;

//==================================================================================
// 1. Message Types
//==================================================================================

/// One intermediate value and its 1-based position in the original sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiddleStep {
    pub id: u32,
    pub data: f64,
}

/// An ordered collection of `MiddleStep`s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiddleSteps {
    pub middle_steps: Vec<MiddleStep>,
}

impl MiddleStep {
    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if self.id != 0 {
            len += wire::key_len(STEP_ID_FIELD) + crate::kernels::leb128::encoded_len(self.id as u64);
        }
        if self.data.to_bits() != 0 {
            len += wire::key_len(STEP_DATA_FIELD) + 8;
        }
        len
    }

    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), NucdiffError> {
        if self.id != 0 {
            wire::encode_key(STEP_ID_FIELD, WireType::Varint, buf)?;
            wire::encode_varint(self.id as u64, buf)?;
        }
        // Only +0.0 is the proto3 default; -0.0 must be written.
        if self.data.to_bits() != 0 {
            wire::encode_key(STEP_DATA_FIELD, WireType::Fixed64, buf)?;
            wire::encode_double(self.data, buf);
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, NucdiffError> {
        let mut step = MiddleStep { id: 0, data: 0.0 };
        let mut cursor = Cursor::new(bytes);

        while (cursor.position() as usize) < bytes.len() {
            match wire::decode_key(&mut cursor)? {
                (STEP_ID_FIELD, WireType::Varint) => {
                    let raw = wire::decode_varint(&mut cursor)?;
                    step.id = u32::try_from(raw).map_err(|_| {
                        NucdiffError::MiddleStepDecodeError(format!(
                            "Middle step id {} is out of range",
                            raw
                        ))
                    })?;
                }
                (STEP_DATA_FIELD, WireType::Fixed64) => {
                    step.data = wire::decode_double(&mut cursor)?;
                }
                (STEP_ID_FIELD, wt) | (STEP_DATA_FIELD, wt) => {
                    return Err(NucdiffError::MiddleStepDecodeError(format!(
                        "Unexpected wire type {:?} for a known middle step field",
                        wt
                    )));
                }
                (_, wt) => wire::skip_field(wt, &mut cursor)?,
            }
        }
        Ok(step)
    }
}

impl MiddleSteps {
    /// Builds a collection from an ordered list of values, assigning ids `1..=n`.
    pub fn from_values(values: &[f64]) -> Self {
        let middle_steps = values
            .iter()
            .zip(1u32..)
            .map(|(&data, id)| MiddleStep { id, data })
            .collect();
        Self { middle_steps }
    }

    /// Serializes the collection into its canonical byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, NucdiffError> {
        let mut buf = Vec::new();
        let mut step_buf = Vec::new();
        for step in &self.middle_steps {
            step_buf.clear();
            step_buf.reserve(step.encoded_len());
            step.encode_to(&mut step_buf)?;

            wire::encode_key(STEPS_FIELD, WireType::LengthDelimited, &mut buf)?;
            wire::encode_length_delimited(&step_buf, &mut buf)?;
        }
        Ok(buf)
    }

    /// Parses a whole record eagerly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NucdiffError> {
        let middle_steps = MiddleStepIter::new(bytes).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { middle_steps })
    }
}

//==================================================================================
// 2. Lazy Decoding
//==================================================================================

/// Iterator over the steps of a serialized `MiddleSteps` record, parsing one
/// embedded message per `next()` call. Iteration stops after the first error.
pub struct MiddleStepIter<'a> {
    cursor: Cursor<&'a [u8]>,
    failed: bool,
}

impl<'a> MiddleStepIter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            failed: false,
        }
    }

    fn next_step(&mut self) -> Result<Option<MiddleStep>, NucdiffError> {
        loop {
            if self.cursor.position() as usize >= self.cursor.get_ref().len() {
                return Ok(None);
            }
            match wire::decode_key(&mut self.cursor)? {
                (STEPS_FIELD, WireType::LengthDelimited) => {
                    let payload = wire::decode_length_delimited(&mut self.cursor)?;
                    return MiddleStep::decode(payload).map(Some);
                }
                (STEPS_FIELD, wt) => {
                    return Err(NucdiffError::MiddleStepDecodeError(format!(
                        "Unexpected wire type {:?} for field 'middle_steps'",
                        wt
                    )));
                }
                (_, wt) => wire::skip_field(wt, &mut self.cursor)?,
            }
        }
    }
}

impl Iterator for MiddleStepIter<'_> {
    type Item = Result<MiddleStep, NucdiffError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_step() {
            Ok(step) => step.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

//==================================================================================
// 3. Public API
//==================================================================================

/// Encodes an ordered list of values into a `MiddleSteps` record.
pub fn encode(values: &[f64]) -> Result<Vec<u8>, NucdiffError> {
    MiddleSteps::from_values(values).to_bytes()
}

/// Lazily decodes a `MiddleSteps` record into its `(id, value)` steps, in the
/// order they were written (ascending id for records produced by `encode`).
pub fn decode(bytes: &[u8]) -> MiddleStepIter<'_> {
    MiddleStepIter::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn decode_pairs(bytes: &[u8]) -> Vec<(u32, f64)> {
        decode(bytes)
            .map(|step| step.map(|s| (s.id, s.data)))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_roundtrip_small_sequence() {
        let encoded = encode(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(decode_pairs(&encoded), vec![(1, 10.0), (2, 20.0), (3, 30.0)]);
    }

    #[test]
    fn test_empty_sequence_encodes_to_empty_record() {
        let encoded = encode(&[]).unwrap();
        assert!(encoded.is_empty());
        assert_eq!(decode(&encoded).count(), 0);
    }

    #[test]
    fn test_wire_layout_matches_protobuf() {
        // middle_steps { id: 1 data: 1.0 }
        let encoded = encode(&[1.0]).unwrap();
        let mut expected = vec![0x0A, 0x0B, 0x08, 0x01, 0x11];
        expected.extend_from_slice(&1.0f64.to_le_bytes());
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_zero_value_is_omitted_and_defaulted() {
        let encoded = encode(&[0.0, -0.0]).unwrap();
        // First element: key + len + id field only.
        assert_eq!(&encoded[..4], &[0x0A, 0x02, 0x08, 0x01]);

        let steps = MiddleSteps::from_bytes(&encoded).unwrap();
        assert_eq!(steps.middle_steps[0], MiddleStep { id: 1, data: 0.0 });
        assert_eq!(steps.middle_steps[1].id, 2);
        assert!(steps.middle_steps[1].data.is_sign_negative());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let mut record = Vec::new();
        // An unknown top-level varint field 7 ...
        wire::encode_key(7, WireType::Varint, &mut record).unwrap();
        wire::encode_varint(99, &mut record).unwrap();

        // ... and a step carrying an unknown string field 5.
        let mut step = Vec::new();
        wire::encode_key(1, WireType::Varint, &mut step).unwrap();
        wire::encode_varint(1, &mut step).unwrap();
        wire::encode_key(5, WireType::LengthDelimited, &mut step).unwrap();
        wire::encode_length_delimited(b"unit=barn", &mut step).unwrap();
        wire::encode_key(2, WireType::Fixed64, &mut step).unwrap();
        wire::encode_double(4.25, &mut step);

        wire::encode_key(1, WireType::LengthDelimited, &mut record).unwrap();
        wire::encode_length_delimited(&step, &mut record).unwrap();

        assert_eq!(decode_pairs(&record), vec![(1, 4.25)]);
    }

    #[test]
    fn test_truncated_record_yields_single_error() {
        let encoded = encode(&[1.5, 2.5]).unwrap();
        let truncated = &encoded[..encoded.len() - 3];

        let results: Vec<_> = decode(truncated).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(NucdiffError::MiddleStepDecodeError(_))
        ));
    }

    #[test]
    fn test_randomized_roundtrip() {
        let mut rng = rand::rng();
        for len in [0usize, 1, 9, 10, 127, 128, 1000] {
            let values: Vec<f64> = (0..len).map(|_| rng.random_range(-1.0e6..1.0e6)).collect();
            let encoded = encode(&values).unwrap();
            let decoded = decode_pairs(&encoded);

            assert_eq!(decoded.len(), len);
            for (i, (id, data)) in decoded.into_iter().enumerate() {
                assert_eq!(id as usize, i + 1);
                assert_eq!(data.to_bits(), values[i].to_bits());
            }
        }
    }
}
