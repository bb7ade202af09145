//! String-dict payload: a balanced tree keyed by string bytes
//! (spec §4.6). Grounded on
//! `examples/original_source/src/composite_rps.c`'s
//! `KAVL_INIT (strdicnodrps, ...)`; `BTreeMap<String, Value>` gives the
//! same ordered insert/lookup/iterate the source's AVL tree provides.

use parking_lot::RwLock;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use refpersys_core::value::Value;
use std::any::Any;
use std::collections::BTreeMap;

pub struct StringDictPayload {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl StringDictPayload {
    pub fn new() -> StringDictPayload {
        StringDictPayload {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn add(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    pub fn lookup(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Vec<(String, Value)> {
        self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl Default for StringDictPayload {
    fn default() -> StringDictPayload {
        StringDictPayload::new()
    }
}

impl Payload for StringDictPayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::StringDict
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn remover(payload: &dyn Payload, _owner: &ObjectRef) {
    if let Some(dict) = payload.as_any().downcast_ref::<StringDictPayload>() {
        dict.entries.write().clear();
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(dict) = payload.as_any().downcast_ref::<StringDictPayload>() else {
        return;
    };
    for (_, value) in dict.iter() {
        if let Some(o) = value.as_object() {
            visit(o);
        }
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(dict) = payload.as_any().downcast_ref::<StringDictPayload>() else {
        return serde_json::Value::Null;
    };
    let entries: Vec<serde_json::Value> = dict
        .iter()
        .into_iter()
        .map(|(k, v)| serde_json::json!({ "key": k, "value": refpersys_core::value::codec::encode(&v) }))
        .collect();
    serde_json::json!({ "payload": "string_dict", "entries": entries })
}
