//! Resolves a space-record's `payload` name to a loader routine (spec
//! §4.7 "The payload name is resolved to a registered payload loader
//! function"). Each arm mirrors the fields its counterpart
//! `dump_serializer` in `refpersys-payload` emits.

use crate::value_codec::decode_oid_text;
use crate::value_codec::decode as decode_value;
use refpersys_core::error::LoadError;
use refpersys_core::object::{ObjectRef, Payload, Runtime};
use refpersys_core::value::Value;
use refpersys_payload::{ClassInfoPayload, DequePayload, MutableSetPayload, ObjectHashtablePayload, SpacePayload, StringDictPayload, SymbolPayload};

/// Builds the payload named `kind` from `record`'s kind-specific fields,
/// resolving any oid text against `rt`.
pub fn load_payload(
    kind: &str,
    record: &serde_json::Map<String, serde_json::Value>,
    owner: &ObjectRef,
    rt: &Runtime,
) -> Result<Box<dyn Payload>, LoadError> {
    match kind {
        "symbol" => {
            let name = record
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| LoadError::MalformedValue("symbol payload missing \"name\"".to_string()))?;
            let value = match record.get("value") {
                Some(v) => decode_value(v, rt)?,
                None => Value::Null,
            };
            Ok(Box::new(SymbolPayload::new(name, value)))
        }
        "class_info" => {
            let super_class = decode_optional_oid_field(record, "super", rt)?;
            let symbol = decode_optional_oid_field(record, "symbol", rt)?;
            let ci = ClassInfoPayload::new(super_class, symbol);
            if let Some(methods) = record.get("methods").and_then(|v| v.as_array()) {
                for entry in methods {
                    let selector_text = entry
                        .get("selector")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| LoadError::MalformedValue("class_info method entry missing \"selector\"".to_string()))?;
                    let closure_json = entry
                        .get("closure")
                        .ok_or_else(|| LoadError::MalformedValue("class_info method entry missing \"closure\"".to_string()))?;
                    let selector = decode_oid_text(selector_text, rt)?;
                    let closure = decode_value(closure_json, rt)?;
                    ci.put_method(selector, closure);
                }
            }
            Ok(Box::new(ci))
        }
        "mutable_set" => {
            let set = MutableSetPayload::new();
            for member in string_array_field(record, "members") {
                set.add(decode_oid_text(member, rt)?);
            }
            Ok(Box::new(set))
        }
        "deque" => {
            let deque = DequePayload::new();
            for element in string_array_field(record, "elements") {
                deque.push_last(decode_oid_text(element, rt)?);
            }
            Ok(Box::new(deque))
        }
        "object_hashtable" => {
            let table = ObjectHashtablePayload::new();
            let elements: Vec<&str> = string_array_field(record, "elements");
            table.reserve(elements.len());
            for element in elements {
                table.add(decode_oid_text(element, rt)?);
            }
            Ok(Box::new(table))
        }
        "string_dict" => {
            let dict = StringDictPayload::new();
            if let Some(entries) = record.get("entries").and_then(|v| v.as_array()) {
                for entry in entries {
                    let key = entry
                        .get("key")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| LoadError::MalformedValue("string_dict entry missing \"key\"".to_string()))?;
                    let value = match entry.get("value") {
                        Some(v) => decode_value(v, rt)?,
                        None => Value::Null,
                    };
                    dict.add(key, value);
                }
            }
            Ok(Box::new(dict))
        }
        "space" => {
            let data = match record.get("space_data") {
                Some(v) => decode_value(v, rt)?,
                None => Value::Null,
            };
            Ok(Box::new(SpacePayload::new(data)))
        }
        other => Err(LoadError::UnknownPayloadKind {
            oid: owner.id().encode(),
            kind: other.to_string(),
        }),
    }
}

fn decode_optional_oid_field(
    record: &serde_json::Map<String, serde_json::Value>,
    key: &str,
    rt: &Runtime,
) -> Result<Option<ObjectRef>, LoadError> {
    match record.get(key).and_then(|v| v.as_str()) {
        Some(s) => Ok(Some(decode_oid_text(s, rt)?)),
        None => Ok(None),
    }
}

fn string_array_field<'a>(record: &'a serde_json::Map<String, serde_json::Value>, key: &str) -> Vec<&'a str> {
    record
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}
