//! Pure (`Runtime`-free) JSON encoding of values (spec §4.7 "Value JSON
//! encoding"). Decoding needs a [`crate::object::Runtime`] to resolve
//! object references and so lives in `refpersys-persist`, which is the
//! only crate that depends on both this module and a `Runtime`.

use super::Value;

/// Encodes a value per spec §4.7: integers and doubles as their JSON
/// scalar, objects as their oid text, strings either bare or tagged (see
/// [`looks_like_oid`]), and the remaining composite kinds as a tagged
/// `{vtype, ...}` object.
pub fn encode(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int(n) => serde_json::json!(n),
        Value::Double(d) => serde_json::json!(d.get()),
        Value::Str(s) => encode_string(s.as_str()),
        Value::Object(o) => serde_json::Value::String(o.id().encode()),
        Value::Json(j) => serde_json::json!({ "vtype": "json", "json": j.get() }),
        Value::Tuple(t) => {
            let arr: Vec<serde_json::Value> = (0..t.arity() as i64)
                .map(|ix| match t.nth(ix) {
                    Some(o) => serde_json::Value::String(o.id().encode()),
                    None => serde_json::Value::Null,
                })
                .collect();
            serde_json::json!({ "vtype": "tuple", "tuple": arr })
        }
        Value::Set(s) => {
            let arr: Vec<serde_json::Value> =
                s.members().iter().map(|o| serde_json::Value::String(o.id().encode())).collect();
            serde_json::json!({ "vtype": "set", "set": arr })
        }
        Value::Closure(c) => {
            let env: Vec<serde_json::Value> = c.captured().iter().map(encode).collect();
            let mut obj = serde_json::json!({
                "vtype": "closure",
                "fn": c.connective().id().encode(),
                "env": env,
            });
            if let Some(meta) = c.metadata() {
                obj["meta"] = encode(meta);
            }
            obj
        }
    }
}

fn encode_string(s: &str) -> serde_json::Value {
    if looks_like_oid(s) {
        serde_json::json!({ "vtype": "string", "string": s })
    } else {
        serde_json::Value::String(s.to_string())
    }
}

/// True when `s` would be ambiguous with an oid's textual form: a leading
/// underscore followed by a base-62 digit (spec §4.7 "Ambiguity note").
pub fn looks_like_oid(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() > 1 && bytes[0] == b'_' && bytes[1].is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_strings_encode_bare() {
        assert_eq!(encode(&Value::Str(std::sync::Arc::new(super::super::RpsString::new("hello")))), serde_json::json!("hello"));
    }

    #[test]
    fn oid_shaped_strings_get_the_tagged_form() {
        let encoded = encode(&Value::Str(std::sync::Arc::new(super::super::RpsString::new("_0abcdefghij01234567"))));
        assert_eq!(encoded["vtype"], "string");
    }

    #[test]
    fn null_encodes_to_json_null() {
        assert_eq!(encode(&Value::Null), serde_json::Value::Null);
    }
}
