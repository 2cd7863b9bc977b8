// In: src/codec/wire.rs

//! Protobuf wire-format primitives: field keys, varints, fixed-width scalars
//! and length-delimited payloads.
//!
//! Only the subset needed by the middle-step messages is implemented, plus
//! `skip_field` so that a reader can step over any field it does not know.
//! Group wire types (deprecated in proto3) are rejected.

use std::io::Cursor;

use crate::error::NucdiffError;
use crate::kernels::leb128;

/// The wire type carried in the low three bits of every field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    StartGroup,
    EndGroup,
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u64) -> Result<Self, NucdiffError> {
        match bits {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            3 => Ok(Self::StartGroup),
            4 => Ok(Self::EndGroup),
            5 => Ok(Self::Fixed32),
            other => Err(NucdiffError::MiddleStepDecodeError(format!(
                "Invalid wire type {}",
                other
            ))),
        }
    }

    fn bits(self) -> u64 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::StartGroup => 3,
            Self::EndGroup => 4,
            Self::Fixed32 => 5,
        }
    }
}

//==================================================================================
// 1. Writers
//==================================================================================

pub fn encode_key(field: u32, wire_type: WireType, buf: &mut Vec<u8>) -> Result<(), NucdiffError> {
    leb128::encode_one(((field as u64) << 3) | wire_type.bits(), buf)
}

/// Byte length of a key for `field`.
pub fn key_len(field: u32) -> usize {
    leb128::encoded_len((field as u64) << 3)
}

pub fn encode_varint(value: u64, buf: &mut Vec<u8>) -> Result<(), NucdiffError> {
    leb128::encode_one(value, buf)
}

pub fn encode_double(value: f64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Writes a length prefix followed by `payload`.
pub fn encode_length_delimited(payload: &[u8], buf: &mut Vec<u8>) -> Result<(), NucdiffError> {
    leb128::encode_one(payload.len() as u64, buf)?;
    buf.extend_from_slice(payload);
    Ok(())
}

//==================================================================================
// 2. Readers
//==================================================================================

/// Reads a field key, returning the field number and its wire type.
pub fn decode_key(cursor: &mut Cursor<&[u8]>) -> Result<(u32, WireType), NucdiffError> {
    let key = leb128::decode_one::<u64>(cursor)?;
    let wire_type = WireType::from_bits(key & 0x7)?;
    let field = u32::try_from(key >> 3).map_err(|_| {
        NucdiffError::MiddleStepDecodeError(format!("Field number out of range in key {}", key))
    })?;
    if field == 0 {
        return Err(NucdiffError::MiddleStepDecodeError(
            "Field number 0 is reserved".to_string(),
        ));
    }
    Ok((field, wire_type))
}

pub fn decode_varint(cursor: &mut Cursor<&[u8]>) -> Result<u64, NucdiffError> {
    leb128::decode_one::<u64>(cursor)
}

pub fn decode_double(cursor: &mut Cursor<&[u8]>) -> Result<f64, NucdiffError> {
    let bytes = take(cursor, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(f64::from_le_bytes(raw))
}

/// Reads a length prefix and returns the payload it frames, borrowed from the input.
pub fn decode_length_delimited<'a>(
    cursor: &mut Cursor<&'a [u8]>,
) -> Result<&'a [u8], NucdiffError> {
    let len = leb128::decode_one::<u64>(cursor)?;
    let len = usize::try_from(len).map_err(|_| {
        NucdiffError::MiddleStepDecodeError(format!("Length prefix {} does not fit in memory", len))
    })?;
    take(cursor, len)
}

/// Steps over the value of a field the reader does not understand.
pub fn skip_field(wire_type: WireType, cursor: &mut Cursor<&[u8]>) -> Result<(), NucdiffError> {
    match wire_type {
        WireType::Varint => decode_varint(cursor).map(|_| ()),
        WireType::Fixed64 => take(cursor, 8).map(|_| ()),
        WireType::Fixed32 => take(cursor, 4).map(|_| ()),
        WireType::LengthDelimited => decode_length_delimited(cursor).map(|_| ()),
        WireType::StartGroup | WireType::EndGroup => Err(NucdiffError::MiddleStepDecodeError(
            "Group wire types are not supported".to_string(),
        )),
    }
}

fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8], NucdiffError> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            NucdiffError::MiddleStepDecodeError(format!(
                "Truncated field: needed {} bytes at offset {}, buffer has {}",
                len,
                start,
                data.len()
            ))
        })?;
    cursor.set_position(end as u64);
    Ok(&data[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip() {
        let mut buf = Vec::new();
        encode_key(1, WireType::LengthDelimited, &mut buf).unwrap();
        encode_key(2, WireType::Fixed64, &mut buf).unwrap();
        assert_eq!(buf, vec![0x0A, 0x11]);

        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(decode_key(&mut cursor).unwrap(), (1, WireType::LengthDelimited));
        assert_eq!(decode_key(&mut cursor).unwrap(), (2, WireType::Fixed64));
    }

    #[test]
    fn test_skip_every_supported_wire_type() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf).unwrap();
        encode_double(1.5, &mut buf);
        buf.extend_from_slice(&[1, 2, 3, 4]);
        encode_length_delimited(b"abc", &mut buf).unwrap();

        let mut cursor = Cursor::new(buf.as_slice());
        skip_field(WireType::Varint, &mut cursor).unwrap();
        skip_field(WireType::Fixed64, &mut cursor).unwrap();
        skip_field(WireType::Fixed32, &mut cursor).unwrap();
        skip_field(WireType::LengthDelimited, &mut cursor).unwrap();
        assert_eq!(cursor.position() as usize, buf.len());
    }

    #[test]
    fn test_groups_and_truncation_are_rejected() {
        let empty: &[u8] = &[];
        assert!(skip_field(WireType::StartGroup, &mut Cursor::new(empty)).is_err());

        let short: &[u8] = &[0x05, b'a'];
        assert!(decode_length_delimited(&mut Cursor::new(short)).is_err());

        let short_double: &[u8] = &[0, 0, 0];
        assert!(decode_double(&mut Cursor::new(short_double)).is_err());
    }
}
