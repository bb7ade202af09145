//! Class-info payload: turns an object into a class, carrying a
//! superclass, a naming symbol object and a method dictionary
//! (spec §4.5 "Method dispatch", §4.6).
//!
//! Grounded on `examples/original_source/src/object_rps.c`'s class-walk
//! (`super` chain lookup) and on `composite_rps.c`'s attribute-table reuse
//! for a class's method dictionary.

use parking_lot::RwLock;
use refpersys_core::object::{AttrTable, ObjectRef, Payload, PayloadTag};
use refpersys_core::value::Value;
use std::any::Any;

pub struct ClassInfoPayload {
    super_class: RwLock<Option<ObjectRef>>,
    symbol: RwLock<Option<ObjectRef>>,
    methods: RwLock<AttrTable>,
}

impl ClassInfoPayload {
    pub fn new(super_class: Option<ObjectRef>, symbol: Option<ObjectRef>) -> ClassInfoPayload {
        ClassInfoPayload {
            super_class: RwLock::new(super_class),
            symbol: RwLock::new(symbol),
            methods: RwLock::new(AttrTable::empty()),
        }
    }

    pub fn symbol(&self) -> Option<ObjectRef> {
        self.symbol.read().clone()
    }

    pub fn set_super(&self, super_class: Option<ObjectRef>) {
        *self.super_class.write() = super_class;
    }

    /// `get-method`: a direct lookup in this class's own dictionary,
    /// without walking `super` (the walk lives in `Runtime::dispatch_method`).
    pub fn get_method(&self, selector: &ObjectRef) -> Option<Value> {
        self.methods.read().find(selector).cloned()
    }

    pub fn put_method(&self, selector: ObjectRef, closure: Value) {
        let mut methods = self.methods.write();
        *methods = methods.put(selector, closure);
    }

    pub fn methods(&self) -> Vec<(ObjectRef, Value)> {
        self.methods.read().iter().cloned().collect()
    }
}

impl Payload for ClassInfoPayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::ClassInfo
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn class_super(&self) -> Option<ObjectRef> {
        self.super_class.read().clone()
    }

    fn class_lookup_method(&self, selector: &ObjectRef) -> Option<Value> {
        self.get_method(selector)
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(ci) = payload.as_any().downcast_ref::<ClassInfoPayload>() else {
        return;
    };
    if let Some(sup) = ci.class_super() {
        visit(&sup);
    }
    if let Some(sym) = ci.symbol() {
        visit(&sym);
    }
    for (selector, closure) in ci.methods() {
        visit(&selector);
        if let Some(o) = closure.as_object() {
            visit(o);
        }
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(ci) = payload.as_any().downcast_ref::<ClassInfoPayload>() else {
        return serde_json::Value::Null;
    };
    let methods: Vec<serde_json::Value> = ci
        .methods()
        .into_iter()
        .map(|(selector, closure)| {
            serde_json::json!({
                "selector": selector.to_string(),
                "closure": refpersys_core::value::codec::encode(&closure),
            })
        })
        .collect();
    serde_json::json!({
        "payload": "class_info",
        "super": ci.class_super().map(|o| o.to_string()),
        "symbol": ci.symbol().map(|o| o.to_string()),
        "methods": methods,
    })
}
