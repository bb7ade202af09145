//! Mutable-set payload: a balanced-tree set of objects keyed by oid
//! (spec §4.6). The spec permits "any correct balanced tree"; this crate
//! uses `BTreeMap<Oid, ObjectRef>`, which gives the same ordered,
//! logarithmic insert/erase/iterate the source's AVL tree
//! (`examples/original_source/src/composite_rps.c`'s `KAVL_INIT
//! (rpsmusetob, ...)`) provides.

use parking_lot::RwLock;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use refpersys_core::oid::Oid;
use refpersys_core::value::SetOb;
use std::any::Any;
use std::collections::BTreeMap;

pub struct MutableSetPayload {
    members: RwLock<BTreeMap<Oid, ObjectRef>>,
}

impl MutableSetPayload {
    pub fn new() -> MutableSetPayload {
        MutableSetPayload {
            members: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn add(&self, member: ObjectRef) -> bool {
        self.members.write().insert(member.id(), member).is_none()
    }

    pub fn remove(&self, member: &ObjectRef) -> bool {
        self.members.write().remove(&member.id()).is_some()
    }

    pub fn contains(&self, member: &ObjectRef) -> bool {
        self.members.read().contains_key(&member.id())
    }

    pub fn cardinal(&self) -> usize {
        self.members.read().len()
    }

    pub fn members(&self) -> Vec<ObjectRef> {
        self.members.read().values().cloned().collect()
    }

    /// `reify-as-set`: snapshots the current membership into an immutable
    /// [`SetOb`] value.
    pub fn reify_as_set(&self) -> SetOb {
        SetOb::new(self.members().into_iter().map(Some).collect())
    }
}

impl Default for MutableSetPayload {
    fn default() -> MutableSetPayload {
        MutableSetPayload::new()
    }
}

impl Payload for MutableSetPayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::MutableSet
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn remover(payload: &dyn Payload, _owner: &ObjectRef) {
    if let Some(set) = payload.as_any().downcast_ref::<MutableSetPayload>() {
        set.members.write().clear();
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(set) = payload.as_any().downcast_ref::<MutableSetPayload>() else {
        return;
    };
    for member in set.members() {
        visit(&member);
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(set) = payload.as_any().downcast_ref::<MutableSetPayload>() else {
        return serde_json::Value::Null;
    };
    let members: Vec<String> = set.members().iter().map(|o| o.to_string()).collect();
    serde_json::json!({ "payload": "mutable_set", "members": members })
}

#[cfg(test)]
mod tests {
    use super::*;
    use refpersys_core::object::Runtime;

    #[test]
    fn add_remove_contains_roundtrip() {
        let rt = Runtime::new();
        let set = MutableSetPayload::new();
        let a = rt.create_object();
        assert!(set.add(a.clone()));
        assert!(!set.add(a.clone()));
        assert!(set.contains(&a));
        assert!(set.remove(&a));
        assert!(!set.contains(&a));
    }

    #[test]
    fn reify_as_set_is_sorted_and_deduplicated() {
        let rt = Runtime::new();
        let set = MutableSetPayload::new();
        let objs: Vec<ObjectRef> = (0..5).map(|_| rt.create_object()).collect();
        for o in &objs {
            set.add(o.clone());
            set.add(o.clone());
        }
        let reified = set.reify_as_set();
        assert_eq!(reified.cardinal(), 5);
    }
}
