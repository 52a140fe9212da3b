//! Conversion between [`Value`] tuples and fixed-length records.

use super::{AttributeDescriptor, RelationSchema};
use crate::error::{Result, RelscanError};
use crate::storage::Record;
use crate::types::Value;

/// Encodes one value per schema attribute into a record of the schema's length.
///
/// # Errors
///
/// Returns `SchemaError` if the number of values differs from the number of
/// attributes or a value has the wrong type, and `UnsupportedType` for an
/// attribute with an unknown type code.
pub fn encode_tuple(schema: &RelationSchema, values: &[Value]) -> Result<Record> {
    if values.len() != schema.attributes.len() {
        return Err(RelscanError::SchemaError(format!(
            "Relation '{}' has {} attributes, got {} values",
            schema.name,
            schema.attributes.len(),
            values.len()
        )));
    }

    let mut record = Record::zeroed(schema.record_length);
    for (attr, value) in schema.descriptors()?.iter().zip(values) {
        let bytes = attr.strategy().encode(value, attr.length())?;
        attr.layout.slice_mut(record.data_mut())?.copy_from_slice(&bytes);
    }
    Ok(record)
}

/// Decodes the given attributes of a record, in the order given.
///
/// # Errors
///
/// Returns `LayoutViolation` if an attribute falls outside the record.
pub fn decode_tuple(attributes: &[AttributeDescriptor], record: &Record) -> Result<Vec<Value>> {
    attributes
        .iter()
        .map(|attr| attr.strategy().decode(attr.layout.slice(record.data())?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AttrDef;

    fn schema() -> RelationSchema {
        RelationSchema::new(
            "emp",
            vec![
                AttrDef::string("name", 6),
                AttrDef::integer("id"),
                AttrDef::float("salary"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let record = encode_tuple(
            &schema(),
            &[
                Value::String("ann".into()),
                Value::Integer(-2),
                Value::Float(1.5),
            ],
        )
        .unwrap();

        let mut expected = b"ann\0\0\0".to_vec();
        expected.extend_from_slice(&(-2i32).to_le_bytes());
        expected.extend_from_slice(&1.5f32.to_le_bytes());
        assert_eq!(record.data(), expected.as_slice());
    }

    #[test]
    fn test_decode_subset_in_given_order() {
        let schema = schema();
        let record = encode_tuple(
            &schema,
            &[
                Value::String("bob".into()),
                Value::Integer(9),
                Value::Float(3.0),
            ],
        )
        .unwrap();

        let descs = schema.descriptors().unwrap();
        let values = decode_tuple(&[descs[2].clone(), descs[0].clone()], &record).unwrap();
        assert_eq!(values, vec![Value::Float(3.0), Value::String("bob".into())]);
    }

    #[test]
    fn test_encode_rejects_arity_and_type_mismatch() {
        let schema = schema();
        assert!(matches!(
            encode_tuple(&schema, &[Value::Integer(1)]),
            Err(RelscanError::SchemaError(_))
        ));
        assert!(matches!(
            encode_tuple(
                &schema,
                &[Value::Integer(1), Value::Integer(2), Value::Float(0.0)]
            ),
            Err(RelscanError::SchemaError(_))
        ));
    }

    #[test]
    fn test_decode_short_record() {
        let descs = schema().descriptors().unwrap();
        assert!(matches!(
            decode_tuple(&descs, &Record::new(vec![0; 8])),
            Err(RelscanError::LayoutViolation { .. })
        ));
    }
}
