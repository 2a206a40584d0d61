//! Order-independent structural equality over schema trees.
//!
//! Objects are compared by key set regardless of declaration order, arrays
//! element-wise. Used by the merge engine to deduplicate object-array
//! entries.

use serde_json::Value;

/// Deep, order-independent equality of two schema nodes.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| structurally_equal(value, other)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| structurally_equal(x, y))
        }
        _ => a == b,
    }
}
