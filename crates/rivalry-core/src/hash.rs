//! Stable hashing of structured values
//!
//! Values are rendered to canonical JSON (object keys sorted recursively,
//! integral floats written as integers, `-0` folded into `0`) and hashed with
//! SHA-256. Two values that differ only in key insertion order or in
//! `1` vs `1.0` hash identically. Array order is significant.

use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Length of the hex prefix used for entity ids
const ID_HEX_LEN: usize = 16;

/// Largest magnitude at which every integer is exactly representable in f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Render a JSON value as canonical text
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => out.push_str(&Value::String(s.clone()).to_string()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &Number, out: &mut String) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        if f == 0.0 {
            out.push('0');
        } else if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&n.to_string());
        }
    }
}

/// SHA-256 of the canonical form, hex encoded
pub fn stable_hash_value(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

/// Stable hash of any serializable value
pub fn stable_hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(stable_hash_value(&value))
}

/// Short prefixed id derived from the stable hash, e.g. `sig_3f2a9c01d4e5b6a7`
pub fn short_id(prefix: &str, value: &Value) -> String {
    let hash = stable_hash_value(value);
    format!("{}_{}", prefix, &hash[..ID_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value =
            serde_json::from_str(r#"{"b": 1, "a": {"y": [1, 2], "x": "s"}}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"a": {"x": "s", "y": [1, 2]}, "b": 1}"#).unwrap();
        assert_eq!(stable_hash_value(&a), stable_hash_value(&b));
    }

    #[test]
    fn test_array_order_matters() {
        assert_ne!(
            stable_hash_value(&json!([1, 2])),
            stable_hash_value(&json!([2, 1]))
        );
    }

    #[test]
    fn test_integral_floats_match_integers() {
        assert_eq!(
            stable_hash_value(&json!({"v": 1.0})),
            stable_hash_value(&json!({"v": 1}))
        );
        assert_eq!(
            stable_hash_value(&json!(-0.0)),
            stable_hash_value(&json!(0))
        );
        assert_ne!(
            stable_hash_value(&json!(1.5)),
            stable_hash_value(&json!(1))
        );
    }

    #[test]
    fn test_canonical_json_shape() {
        let value = json!({"z": null, "a": [true, "x\"y"], "m": 2.5});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":[true,"x\"y"],"m":2.5,"z":null}"#
        );
    }

    #[test]
    fn test_short_id_prefix_and_length() {
        let id = short_id("sig", &json!({"term": "termA"}));
        assert!(id.starts_with("sig_"));
        assert_eq!(id.len(), 4 + ID_HEX_LEN);
    }

    #[test]
    fn test_stable_hash_of_struct() {
        #[derive(Serialize)]
        struct Probe {
            name: &'static str,
            count: u32,
        }
        let hash = stable_hash(&Probe {
            name: "a",
            count: 2,
        })
        .unwrap();
        assert_eq!(hash, stable_hash_value(&json!({"count": 2, "name": "a"})));
        assert_eq!(hash.len(), 64);
    }
}
