//! Deterministic canonicalization and fingerprinting (spec component C1).
//!
//! [`canonicalize`] maps a [`Value`] tree to a stable byte string; every
//! primitive in this workspace (trace, capture, db) fingerprints its inputs
//! and outputs through this crate so that two structurally-equal calls
//! always land on the same fixture key.

mod canon;
mod error;
pub mod sql;
mod value;

pub use canon::{canonicalize, fingerprint, fingerprint_prefix};
pub use error::EncodingError;
pub use value::{OrderedMap, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sorts_object_keys_at_every_level() {
        let a = Value::object([
            ("b".into(), Value::Int(2)),
            ("a".into(), Value::object([("z".into(), Value::Int(1)), ("y".into(), Value::Int(2))])),
        ]);
        let b = Value::object([
            ("a".into(), Value::object([("y".into(), Value::Int(2)), ("z".into(), Value::Int(1))])),
            ("b".into(), Value::Int(2)),
        ]);
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn preserves_array_order_but_sorts_sets() {
        let ordered = Value::Array(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(canonicalize(&ordered), b"[3,1,2]");

        let set_a = Value::Set(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        let set_b = Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(canonicalize(&set_a), canonicalize(&set_b));
    }

    #[test]
    fn rounds_floats_to_six_decimals() {
        let a = Value::Float(1.0 / 3.0);
        let b = Value::Float(0.333333);
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn nan_becomes_null_and_infinities_become_strings() {
        assert_eq!(canonicalize(&Value::Float(f64::NAN)), b"null");
        assert_eq!(canonicalize(&Value::Float(f64::INFINITY)), b"\"Infinity\"");
        assert_eq!(canonicalize(&Value::Float(f64::NEG_INFINITY)), b"\"-Infinity\"");
    }

    #[test]
    fn byte_strings_are_base64() {
        let v = Value::Bytes(vec![1, 2, 3]);
        assert_eq!(canonicalize(&v), format!("\"{}\"", base64::encode([1, 2, 3])).as_bytes());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = fingerprint(&Value::String("hello".into()));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[quickcheck_macros::quickcheck]
    fn determinism_is_independent_of_object_insertion_order(pairs: Vec<(String, i64)>) -> bool {
        // Dedupe by key first: duplicate-key maps have no defined semantics
        // to compare against here, only insertion order does.
        let unique: std::collections::BTreeMap<String, i64> = pairs.into_iter().collect();
        let forward: Vec<(String, Value)> = unique
            .iter()
            .map(|(k, v)| (k.clone(), Value::Int(*v)))
            .collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        canonicalize(&Value::Object(forward)) == canonicalize(&Value::Object(reversed))
    }

    #[test]
    fn sql_normalization_is_stable_across_formatting() {
        let a = "select * from users where id=1 -- comment";
        let b = "SELECT   *\nFROM users\nWHERE id = 1";
        assert_eq!(sql::normalize(a), sql::normalize(b));
    }

    #[test]
    fn write_detection_covers_cte_prelude() {
        assert!(sql::is_write("INSERT INTO users (id) VALUES (1)"));
        assert!(sql::is_write(
            "WITH deleted AS (DELETE FROM sessions RETURNING id) SELECT * FROM deleted"
        ));
        assert!(!sql::is_write("SELECT * FROM users"));
    }
}
