use crate::Value;
use std::fmt::Write as _;

/// Encodes `value` into its canonical byte representation: sorted object
/// keys at every level, no incidental whitespace, 6-decimal float rounding,
/// NaN mapped to `null`, infinities mapped to the strings `"Infinity"` /
/// `"-Infinity"`, byte strings base64-encoded, timestamps rendered as
/// RFC 3339 UTC, and `Set` members sorted by their own canonical encoding.
///
/// Two structurally-equal values under these rules always encode to the
/// same bytes, independent of map insertion order or numeric
/// representation, which is the property [`fingerprint`] relies on.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_value(value, &mut out);
    out.into_bytes()
}

/// `SHA-256(canonicalize(value))`, hex-encoded.
pub fn fingerprint(value: &Value) -> String {
    use sha2::{Digest, Sha256};
    let bytes = canonicalize(value);
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

/// The first `len` hex characters of a fingerprint, used in filesystem
/// keys (`{fingerprint16}_{ordinal}.json` and friends).
pub fn fingerprint_prefix(fp: &str, len: usize) -> &str {
    &fp[..len.min(fp.len())]
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::UInt(u) => {
            let _ = write!(out, "{u}");
        }
        Value::Float(f) => write_float(*f, out),
        Value::String(s) => write_json_string(s, out),
        Value::Bytes(b) => write_json_string(&base64::encode(b), out),
        Value::Timestamp(ts) => {
            let rfc3339 = ts
                .to_offset(time::UtcOffset::UTC)
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default();
            write_json_string(&rfc3339, out);
        }
        Value::Array(items) => write_sequence(items.iter(), out),
        Value::Set(items) => {
            let mut encoded: Vec<String> = items
                .iter()
                .map(|v| String::from_utf8(canonicalize(v)).expect("canonical output is utf8"))
                .collect();
            encoded.sort();
            out.push('[');
            for (i, item) in encoded.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(item);
            }
            out.push(']');
        }
        Value::Object(entries) => {
            let mut sorted: Vec<&(String, Value)> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            out.push('{');
            for (i, (key, val)) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_value(val, out);
            }
            out.push('}');
        }
    }
}

fn write_sequence<'a, I: Iterator<Item = &'a Value>>(items: I, out: &mut String) {
    out.push('[');
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(item, out);
    }
    out.push(']');
}

fn write_float(f: f64, out: &mut String) {
    if f.is_nan() {
        out.push_str("null");
        return;
    }
    if f.is_infinite() {
        out.push_str(if f > 0.0 { "\"Infinity\"" } else { "\"-Infinity\"" });
        return;
    }
    let rounded = (f * 1_000_000.0).round() / 1_000_000.0;
    // Render with a fixed 6-decimal then trim trailing zeros, so 2.0 and
    // 2.000001 both produce a stable, minimal textual form.
    let mut s = format!("{rounded:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    out.push_str(&s);
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
