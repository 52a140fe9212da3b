//! `AttrType`, `Value` and `CompareOp` definitions for relscan.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::strategy::{AttrStrategy, FloatStrategy, IntegerStrategy, StringStrategy};

/// Supported attribute types.
///
/// The discriminants are the raw codes the catalog persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttrType {
    /// Fixed-length, NUL-padded byte string.
    String = 0,
    /// 32-bit signed integer, little-endian.
    Integer = 1,
    /// 32-bit floating point, little-endian.
    Float = 2,
}

impl AttrType {
    /// Returns the name of the type as shown in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AttrType::String => "STRING",
            AttrType::Integer => "INTEGER",
            AttrType::Float => "FLOAT",
        }
    }

    /// Returns the raw catalog code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Converts a raw catalog code, returning None for unknown codes.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AttrType::String),
            1 => Some(AttrType::Integer),
            2 => Some(AttrType::Float),
            _ => None,
        }
    }

    /// Returns the required byte width, or None for variable-width strings.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            AttrType::Integer | AttrType::Float => Some(4),
            AttrType::String => None,
        }
    }

    /// Returns the parse/compare/copy strategy for this type.
    #[must_use]
    pub fn strategy(self) -> &'static dyn AttrStrategy {
        match self {
            AttrType::String => &StringStrategy,
            AttrType::Integer => &IntegerStrategy,
            AttrType::Float => &FloatStrategy,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// String value (trailing NUL padding stripped).
    String(String),
    /// Integer value.
    Integer(i32),
    /// Float value.
    Float(f32),
}

impl Value {
    /// Returns the attribute type this value encodes as.
    #[must_use]
    pub fn attr_type(&self) -> AttrType {
        match self {
            Value::String(_) => AttrType::String,
            Value::Integer(_) => AttrType::Integer,
            Value::Float(_) => AttrType::Float,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Comparison operator of a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Parses a comparison operator from its SQL symbol.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(CompareOp::Eq),
            "<>" | "!=" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Lte),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Gte),
            _ => None,
        }
    }

    /// Returns the SQL symbol of the operator.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }

    /// Applies the operator to the ordering of `stored` relative to `literal`.
    #[must_use]
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
