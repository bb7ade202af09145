//! Symbol payload: a name bound to a value, resolved/rebound by the
//! runtime's symbol table (spec §4.6).
//!
//! Grounded on `examples/original_source/src/symbol_rps.c`'s
//! name/value pair and rebind-in-place semantics.

use parking_lot::RwLock;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use refpersys_core::value::Value;
use std::any::Any;

pub struct SymbolPayload {
    name: String,
    value: RwLock<Value>,
}

impl SymbolPayload {
    pub fn new(name: impl Into<String>, value: Value) -> SymbolPayload {
        SymbolPayload {
            name: name.into(),
            value: RwLock::new(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve(&self) -> Value {
        self.value.read().clone()
    }

    pub fn rebind(&self, value: Value) {
        *self.value.write() = value;
    }
}

impl Payload for SymbolPayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::Symbol
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(sym) = payload.as_any().downcast_ref::<SymbolPayload>() else {
        return;
    };
    if let Some(o) = sym.resolve().as_object() {
        visit(o);
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(sym) = payload.as_any().downcast_ref::<SymbolPayload>() else {
        return serde_json::Value::Null;
    };
    serde_json::json!({
        "payload": "symbol",
        "name": sym.name(),
        "value": refpersys_core::value::codec::encode(&sym.resolve()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebind_replaces_the_resolved_value() {
        let sym = SymbolPayload::new("pi", Value::Int(3));
        assert_eq!(sym.resolve().as_int(), Some(3));
        sym.rebind(Value::Int(4));
        assert_eq!(sym.resolve().as_int(), Some(4));
    }
}
