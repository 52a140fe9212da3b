//! Attribute-type strategies.
//!
//! A strategy bundles everything type-specific about an attribute: turning a
//! textual literal into stored bytes, comparing stored bytes against those
//! literal bytes, encoding and decoding [`Value`]s, and copying the field
//! between records. The predicate path and the projection path both select a
//! strategy once per attribute via [`AttrType::strategy`].

use std::cmp::Ordering;

use crate::error::{Result, RelscanError};
use crate::types::{AttrType, FieldLayout, Value};

/// Type-specific parse, compare and copy semantics.
pub trait AttrStrategy: Send + Sync {
    /// The attribute type this strategy serves.
    fn attr_type(&self) -> AttrType;

    /// Converts a textual filter literal into `length` bytes of stored form.
    ///
    /// # Errors
    ///
    /// Returns `LiteralParseFailed` if the text is not a valid literal of this type.
    fn parse_literal(&self, literal: &str, length: usize) -> Result<Vec<u8>>;

    /// Orders stored field bytes relative to literal bytes.
    ///
    /// Returns None when the two are not comparable (e.g. a NaN float).
    fn compare(&self, stored: &[u8], literal: &[u8]) -> Option<Ordering>;

    /// Encodes a value into `length` bytes of stored form.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the value has a different type.
    fn encode(&self, value: &Value, length: usize) -> Result<Vec<u8>>;

    /// Decodes stored field bytes.
    ///
    /// # Errors
    ///
    /// Returns `RecordLengthMismatch` if the field has the wrong width.
    fn decode(&self, bytes: &[u8]) -> Result<Value>;

    /// Copies the field at `from` in `src` to `dst_offset` in `dst`.
    ///
    /// Both ranges are bounds-checked before any byte moves.
    ///
    /// # Errors
    ///
    /// Returns `LayoutViolation` if either range falls outside its record.
    fn copy_field(
        &self,
        src: &[u8],
        from: FieldLayout,
        dst: &mut [u8],
        dst_offset: usize,
    ) -> Result<()> {
        let bytes = from.slice(src)?;
        FieldLayout::new(dst_offset, from.length)
            .slice_mut(dst)?
            .copy_from_slice(bytes);
        Ok(())
    }
}

fn parse_error(literal: &str, ty: AttrType, reason: impl ToString) -> RelscanError {
    RelscanError::LiteralParseFailed {
        literal: literal.to_string(),
        attr_type: ty.name(),
        reason: reason.to_string(),
    }
}

fn type_mismatch(expected: AttrType, value: &Value) -> RelscanError {
    RelscanError::SchemaError(format!(
        "Expected {expected} value, got {}",
        value.attr_type()
    ))
}

fn word(bytes: &[u8]) -> Option<[u8; 4]> {
    bytes.try_into().ok()
}

fn require_word(bytes: &[u8]) -> Result<[u8; 4]> {
    word(bytes).ok_or(RelscanError::RecordLengthMismatch {
        expected: 4,
        actual: bytes.len(),
    })
}

fn require_width(ty: AttrType, length: usize) -> Result<()> {
    match ty.fixed_width() {
        Some(width) if width != length => Err(RelscanError::SchemaError(format!(
            "{ty} attributes are {width} bytes wide, not {length}"
        ))),
        _ => Ok(()),
    }
}

/// Bytes up to (not including) the first NUL.
fn until_nul(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .position(|&b| b == 0)
        .map_or(bytes, |end| &bytes[..end])
}

fn padded(bytes: &[u8], length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    let n = bytes.len().min(length);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// NUL-padded fixed-length strings, compared bytewise up to the first NUL.
#[derive(Debug, Clone, Copy)]
pub struct StringStrategy;

impl AttrStrategy for StringStrategy {
    fn attr_type(&self) -> AttrType {
        AttrType::String
    }

    fn parse_literal(&self, literal: &str, length: usize) -> Result<Vec<u8>> {
        Ok(padded(literal.as_bytes(), length))
    }

    fn compare(&self, stored: &[u8], literal: &[u8]) -> Option<Ordering> {
        let n = stored.len().min(literal.len());
        Some(until_nul(&stored[..n]).cmp(until_nul(&literal[..n])))
    }

    fn encode(&self, value: &Value, length: usize) -> Result<Vec<u8>> {
        match value {
            Value::String(s) => Ok(padded(s.as_bytes(), length)),
            other => Err(type_mismatch(AttrType::String, other)),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(Value::String(
            String::from_utf8_lossy(until_nul(bytes)).into_owned(),
        ))
    }
}

/// Little-endian `i32`, compared numerically.
#[derive(Debug, Clone, Copy)]
pub struct IntegerStrategy;

impl AttrStrategy for IntegerStrategy {
    fn attr_type(&self) -> AttrType {
        AttrType::Integer
    }

    fn parse_literal(&self, literal: &str, length: usize) -> Result<Vec<u8>> {
        require_width(AttrType::Integer, length)?;
        let value: i32 = literal
            .trim()
            .parse()
            .map_err(|e| parse_error(literal, AttrType::Integer, e))?;
        Ok(value.to_le_bytes().to_vec())
    }

    fn compare(&self, stored: &[u8], literal: &[u8]) -> Option<Ordering> {
        let a = i32::from_le_bytes(word(stored)?);
        let b = i32::from_le_bytes(word(literal)?);
        Some(a.cmp(&b))
    }

    fn encode(&self, value: &Value, length: usize) -> Result<Vec<u8>> {
        require_width(AttrType::Integer, length)?;
        match value {
            Value::Integer(i) => Ok(i.to_le_bytes().to_vec()),
            other => Err(type_mismatch(AttrType::Integer, other)),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(Value::Integer(i32::from_le_bytes(require_word(bytes)?)))
    }
}

/// Little-endian `f32`, compared numerically.
#[derive(Debug, Clone, Copy)]
pub struct FloatStrategy;

impl AttrStrategy for FloatStrategy {
    fn attr_type(&self) -> AttrType {
        AttrType::Float
    }

    fn parse_literal(&self, literal: &str, length: usize) -> Result<Vec<u8>> {
        require_width(AttrType::Float, length)?;
        let value: f32 = literal
            .trim()
            .parse()
            .map_err(|e| parse_error(literal, AttrType::Float, e))?;
        if !value.is_finite() {
            return Err(parse_error(
                literal,
                AttrType::Float,
                "value is not a finite FLOAT",
            ));
        }
        Ok(value.to_le_bytes().to_vec())
    }

    fn compare(&self, stored: &[u8], literal: &[u8]) -> Option<Ordering> {
        let a = f32::from_le_bytes(word(stored)?);
        let b = f32::from_le_bytes(word(literal)?);
        a.partial_cmp(&b)
    }

    fn encode(&self, value: &Value, length: usize) -> Result<Vec<u8>> {
        require_width(AttrType::Float, length)?;
        match value {
            Value::Float(f) => Ok(f.to_le_bytes().to_vec()),
            other => Err(type_mismatch(AttrType::Float, other)),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(Value::Float(f32::from_le_bytes(require_word(bytes)?)))
    }
}
