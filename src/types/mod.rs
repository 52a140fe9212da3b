//! Attribute types, values and per-type strategies.

mod layout;
mod strategy;
mod value;

pub use layout::FieldLayout;
pub use strategy::{AttrStrategy, FloatStrategy, IntegerStrategy, StringStrategy};
pub use value::{AttrType, CompareOp, Value};
