//! Decoding of spec §4.7's "Value JSON encoding" back into
//! [`Value`]s. The pure, `Runtime`-free encode half lives in
//! `refpersys_core::value::codec`; decoding needs a [`Runtime`] to resolve
//! oid text into live [`ObjectRef`]s (via `Runtime::ensure_object`, which
//! also satisfies the loader's "forward references resolve immediately"
//! requirement for values nested inside attributes, components and
//! payload fields), so it lives here instead.

use refpersys_core::error::LoadError;
use refpersys_core::object::{ObjectRef, Runtime};
use refpersys_core::oid::Oid;
use refpersys_core::value::{BoxedDouble, BoxedJson, ClosureOb, RpsString, SetOb, TupleOb, Value};
use std::sync::Arc;

/// Decodes a JSON value per spec §4.7, resolving any embedded oid text
/// against `rt`.
pub fn decode(json: &serde_json::Value, rt: &Runtime) -> Result<Value, LoadError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Err(LoadError::MalformedValue(format!("unexpected JSON boolean {b}"))),
        serde_json::Value::Number(n) => decode_number(n),
        serde_json::Value::String(s) => decode_bare_string(s, rt),
        serde_json::Value::Array(_) => Err(LoadError::MalformedValue("unexpected bare JSON array".to_string())),
        serde_json::Value::Object(map) => decode_tagged(map, rt),
    }
}

fn decode_number(n: &serde_json::Number) -> Result<Value, LoadError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    let f = n
        .as_f64()
        .ok_or_else(|| LoadError::MalformedValue(format!("number out of range: {n}")))?;
    let boxed = BoxedDouble::new(f).ok_or_else(|| LoadError::MalformedValue("NaN is not a valid double value".to_string()))?;
    Ok(Value::Double(Arc::new(boxed)))
}

/// A bare JSON string is an object reference when its bytes parse as a
/// full 20-character oid, and a plain string otherwise — mirroring the
/// encoder's choice to leave non-ambiguous strings untagged.
fn decode_bare_string(s: &str, rt: &Runtime) -> Result<Value, LoadError> {
    match Oid::decode(s) {
        Ok((oid, consumed)) if consumed == s.len() => Ok(Value::Object(rt.ensure_object(oid))),
        _ => Ok(Value::Str(Arc::new(RpsString::new(s)))),
    }
}

/// Decodes a full 20-character oid string into a live object, failing if
/// any byte is left over or the digits are out of range.
pub(crate) fn decode_oid_text(s: &str, rt: &Runtime) -> Result<ObjectRef, LoadError> {
    let (oid, consumed) = Oid::decode(s).map_err(|e| LoadError::MalformedValue(format!("bad oid {s:?}: {e}")))?;
    if consumed != s.len() {
        return Err(LoadError::MalformedValue(format!("trailing bytes after oid {s:?}")));
    }
    Ok(rt.ensure_object(oid))
}

fn decode_tagged(map: &serde_json::Map<String, serde_json::Value>, rt: &Runtime) -> Result<Value, LoadError> {
    if let Some(vtype) = map.get("vtype").and_then(|v| v.as_str()) {
        return match vtype {
            "string" => {
                let s = field_str(map, "string")?;
                Ok(Value::Str(Arc::new(RpsString::new(s))))
            }
            "json" => {
                let tree = map
                    .get("json")
                    .cloned()
                    .ok_or_else(|| LoadError::MalformedValue("json value missing \"json\" field".to_string()))?;
                Ok(Value::Json(Arc::new(BoxedJson::new(tree))))
            }
            "tuple" => {
                let components = field_array(map, "tuple")?
                    .iter()
                    .map(|el| decode_optional_object(el, rt))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Tuple(Arc::new(TupleOb::new(components))))
            }
            "set" => {
                let members = field_array(map, "set")?
                    .iter()
                    .map(|el| decode_optional_object(el, rt))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Set(Arc::new(SetOb::new(members))))
            }
            "closure" => {
                let connective = decode_oid_text(field_str(map, "fn")?, rt)?;
                let captured = field_array(map, "env")?
                    .iter()
                    .map(|el| decode(el, rt))
                    .collect::<Result<Vec<_>, _>>()?;
                let metadata = map.get("meta").map(|m| decode(m, rt)).transpose()?;
                Ok(Value::Closure(Arc::new(ClosureOb::new(connective, metadata, captured))))
            }
            other => Err(LoadError::MalformedValue(format!("unknown vtype {other:?}"))),
        };
    }
    // Defensive support for the object `{oid}` form named in spec §4.7
    // alongside the bare-string form (the encoder here only ever emits the
    // bare form, but a foreign dump is free to use either).
    if let Some(oid_field) = map.get("oid").and_then(|v| v.as_str()) {
        return Ok(Value::Object(decode_oid_text(oid_field, rt)?));
    }
    Err(LoadError::MalformedValue(format!(
        "JSON object has neither a \"vtype\" nor an \"oid\" field: {map:?}"
    )))
}

fn decode_optional_object(el: &serde_json::Value, rt: &Runtime) -> Result<Option<ObjectRef>, LoadError> {
    match el {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => decode_oid_text(s, rt).map(Some),
        other => Err(LoadError::MalformedValue(format!("expected oid text or null, got {other}"))),
    }
}

fn field_str<'a>(map: &'a serde_json::Map<String, serde_json::Value>, key: &str) -> Result<&'a str, LoadError> {
    map.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| LoadError::MalformedValue(format!("missing or non-string field {key:?}")))
}

fn field_array<'a>(
    map: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<&'a Vec<serde_json::Value>, LoadError> {
    map.get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| LoadError::MalformedValue(format!("missing or non-array field {key:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use refpersys_core::value::codec;

    #[test]
    fn integers_and_nulls_roundtrip() {
        let rt = Runtime::new();
        assert_eq!(decode(&serde_json::json!(42), &rt).unwrap().as_int(), Some(42));
        assert!(decode(&serde_json::Value::Null, &rt).unwrap().is_null());
    }

    #[test]
    fn plain_string_roundtrips_through_encode() {
        let rt = Runtime::new();
        let original = Value::Str(Arc::new(RpsString::new("hello")));
        let encoded = codec::encode(&original);
        let decoded = decode(&encoded, &rt).unwrap();
        assert_eq!(decoded.as_str(), Some("hello"));
    }

    #[test]
    fn object_reference_resolves_to_the_same_oid() {
        let rt = Runtime::new();
        let obj = rt.create_object();
        let encoded = codec::encode(&Value::Object(obj.clone()));
        let decoded = decode(&encoded, &rt).unwrap();
        assert_eq!(decoded.as_object().unwrap().id(), obj.id());
    }

    #[test]
    fn oid_shaped_string_survives_the_tagged_form() {
        let rt = Runtime::new();
        let original = Value::Str(Arc::new(RpsString::new("_0abcdefghij01234567")));
        let encoded = codec::encode(&original);
        let decoded = decode(&encoded, &rt).unwrap();
        assert_eq!(decoded.as_str(), Some("_0abcdefghij01234567"));
    }

    #[test]
    fn closure_roundtrips_with_captures() {
        let rt = Runtime::new();
        let connective = rt.create_object();
        let closure = Value::Closure(Arc::new(ClosureOb::new(
            connective.clone(),
            None,
            vec![Value::Int(42), Value::Str(Arc::new(RpsString::new("x")))],
        )));
        let encoded = codec::encode(&closure);
        let decoded = decode(&encoded, &rt).unwrap();
        match decoded {
            Value::Closure(c) => {
                assert_eq!(c.connective().id(), connective.id());
                assert_eq!(c.captured()[0].as_int(), Some(42));
                assert_eq!(c.captured()[1].as_str(), Some("x"));
            }
            other => panic!("expected closure, got {other:?}"),
        }
    }
}
