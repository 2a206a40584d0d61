//! Field-shape classification for merge rules.
//!
//! Every merge rule is a total function over this closed variant set
//! instead of ad hoc runtime shape inspection of JSON values.

use serde_json::Value;

/// The shape of a fragment field, as seen by the merge engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A string, number, boolean or null.
    Scalar,
    /// An array with no elements; merging it is a no-op.
    EmptyArray,
    /// An array of scalars; merged as a deduplicated union.
    PrimitiveArray,
    /// An array containing objects or arrays; merged by structural-dedup
    /// append.
    ObjectArray,
    /// A JSON object; merged field-wise, recursively.
    Object,
}

impl FieldShape {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => FieldShape::Object,
            Value::Array(items) => {
                if items.is_empty() {
                    FieldShape::EmptyArray
                } else if items.iter().all(is_primitive) {
                    FieldShape::PrimitiveArray
                } else {
                    FieldShape::ObjectArray
                }
            }
            _ => FieldShape::Scalar,
        }
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_scalars() {
        assert_eq!(FieldShape::of(&json!("mail")), FieldShape::Scalar);
        assert_eq!(FieldShape::of(&json!(3)), FieldShape::Scalar);
        assert_eq!(FieldShape::of(&json!(false)), FieldShape::Scalar);
        assert_eq!(FieldShape::of(&json!(null)), FieldShape::Scalar);
    }

    #[test]
    fn test_classify_arrays() {
        assert_eq!(FieldShape::of(&json!([])), FieldShape::EmptyArray);
        assert_eq!(
            FieldShape::of(&json!(["tabs", "storage"])),
            FieldShape::PrimitiveArray
        );
        assert_eq!(
            FieldShape::of(&json!([{ "id": "Foo" }])),
            FieldShape::ObjectArray
        );
        // A single non-scalar element makes the whole array structural.
        assert_eq!(
            FieldShape::of(&json!(["tabs", { "id": "Foo" }])),
            FieldShape::ObjectArray
        );
    }

    #[test]
    fn test_classify_object() {
        assert_eq!(FieldShape::of(&json!({ "a": 1 })), FieldShape::Object);
    }
}
