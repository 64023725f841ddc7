use std::collections::BTreeMap;

/// A JSON-compatible value tree, extended with the handful of shapes
/// `canonicalize` needs to treat specially: raw byte strings, timestamps,
/// and unordered collections.
///
/// Plain JSON decodes (function arguments, recorded outputs, SQL params)
/// land as [`Value::Object`] / [`Value::Array`] / scalars via
/// [`Value::from_json`]. Callers that need set semantics or byte/timestamp
/// handling build those variants directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// An IEEE-754 float, or a fixed-precision decimal already rendered to
    /// its `f64` approximation by the caller.
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(time::OffsetDateTime),
    /// Order is significant and preserved as given.
    Array(Vec<Value>),
    /// Order is not significant; elements are sorted by their canonical
    /// encoding before output.
    Set(Vec<Value>),
    /// Keys are sorted lexicographically regardless of insertion order.
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn object<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Value {
        Value::Object(entries.into_iter().collect())
    }

    /// Converts a `serde_json::Value` into our canonical [`Value`] tree.
    /// JSON has no native set or byte-string type, so objects/arrays map
    /// straight across and numbers are classified by shape.
    pub fn from_json(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convenience for types that already implement `serde::Serialize`:
    /// round-trips through `serde_json::Value` first.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Value, crate::EncodingError> {
        let json = serde_json::to_value(value).map_err(|err| {
            crate::EncodingError::NonSerializable {
                type_name: std::any::type_name::<T>().to_string(),
                source: err,
            }
        })?;
        Ok(Value::from_json(json))
    }
}

/// An ordered map used by call sites that need to build an
/// [`Value::Object`] incrementally while keeping a handle for lookups.
pub type OrderedMap = BTreeMap<String, Value>;
