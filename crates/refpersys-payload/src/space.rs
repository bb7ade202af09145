//! Space payload: a persistence partition carrying a single value
//! (spec §4.6 "space | a single carried value (space-data) | load,
//! serialize").
//!
//! Grounded on `examples/original_source/src/composite_rps.c`'s
//! `rpsldpy_space`, which loads `space_data` directly into the payload.

use parking_lot::RwLock;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use refpersys_core::value::Value;
use std::any::Any;

pub struct SpacePayload {
    data: RwLock<Value>,
}

impl SpacePayload {
    pub fn new(data: Value) -> SpacePayload {
        SpacePayload { data: RwLock::new(data) }
    }

    pub fn load(&self) -> Value {
        self.data.read().clone()
    }

    pub fn serialize(&self, data: Value) {
        *self.data.write() = data;
    }
}

impl Payload for SpacePayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::Space
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(space) = payload.as_any().downcast_ref::<SpacePayload>() else {
        return;
    };
    if let Some(o) = space.load().as_object() {
        visit(o);
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(space) = payload.as_any().downcast_ref::<SpacePayload>() else {
        return serde_json::Value::Null;
    };
    serde_json::json!({
        "payload": "space",
        "space_data": refpersys_core::value::codec::encode(&space.load()),
    })
}
