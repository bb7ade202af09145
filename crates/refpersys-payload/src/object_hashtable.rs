//! Object-hashtable payload: a single prime-sized, open-addressed bucket
//! array with tombstones (spec §4.6). Unlike the core's 620-way
//! partitioned registry (`refpersys_core::object::Runtime`'s global
//! table), this is one unpartitioned table per payload instance.
//!
//! Grounded on `examples/original_source/src/object_rps.c`'s hash-table
//! probing/rehash policy, reapplied at a single-table scale here.

use parking_lot::RwLock;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use refpersys_core::oid::Oid;
use refpersys_core::primes;
use refpersys_core::value::SetOb;
use std::any::Any;

#[derive(Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(ObjectRef),
}

struct Table {
    slots: Vec<Slot>,
    card: usize,
}

impl Table {
    fn new(capacity: i64) -> Table {
        Table {
            slots: vec![Slot::Empty; capacity.max(1) as usize],
            card: 0,
        }
    }

    fn is_nearly_full(&self) -> bool {
        let cap = self.slots.len();
        let empty = self.slots.iter().filter(|s| matches!(s, Slot::Empty)).count();
        self.card + 2 > cap || empty < cap / 4
    }

    fn start(&self, oid: Oid) -> usize {
        ((oid.hi() ^ oid.lo()) % self.slots.len() as u64) as usize
    }

    fn find_index(&self, oid: Oid) -> Option<usize> {
        let cap = self.slots.len();
        let start = self.start(oid);
        for step in 0..cap {
            let ix = (start + step) % cap;
            match &self.slots[ix] {
                Slot::Empty => return None,
                Slot::Occupied(o) if o.id() == oid => return Some(ix),
                _ => continue,
            }
        }
        None
    }

    fn insert_unchecked(&mut self, obj: ObjectRef) {
        let cap = self.slots.len();
        let start = self.start(obj.id());
        for step in 0..cap {
            let ix = (start + step) % cap;
            if matches!(self.slots[ix], Slot::Empty | Slot::Tombstone) {
                self.slots[ix] = Slot::Occupied(obj);
                self.card += 1;
                return;
            }
        }
        table_overflow();
    }

    fn rehash_to(&mut self, new_cap: i64) {
        let old = std::mem::replace(self, Table::new(new_cap));
        for slot in old.slots {
            if let Slot::Occupied(obj) = slot {
                self.insert_unchecked(obj);
            }
        }
    }
}

fn table_overflow() -> ! {
    refpersys_core::fatal!("object-hashtable payload has no free slot after rehash")
}

pub struct ObjectHashtablePayload {
    table: RwLock<Table>,
}

impl ObjectHashtablePayload {
    pub fn new() -> ObjectHashtablePayload {
        let initial = primes::prime_above(7).unwrap_or(11);
        ObjectHashtablePayload {
            table: RwLock::new(Table::new(initial)),
        }
    }

    pub fn add(&self, obj: ObjectRef) -> bool {
        let mut table = self.table.write();
        if table.find_index(obj.id()).is_some() {
            return false;
        }
        if table.is_nearly_full() {
            self.grow_locked(&mut table);
        }
        table.insert_unchecked(obj);
        true
    }

    fn grow_locked(&self, table: &mut Table) {
        let new_cap = primes::prime_above(3 * table.card as i64 / 2 + table.slots.len() as i64 / 8 + 6)
            .unwrap_or_else(|| refpersys_core::fatal!("object-hashtable payload cannot grow further"));
        table.rehash_to(new_cap);
    }

    pub fn remove(&self, obj: &ObjectRef) -> bool {
        let mut table = self.table.write();
        match table.find_index(obj.id()) {
            Some(ix) => {
                table.slots[ix] = Slot::Tombstone;
                table.card -= 1;
                true
            }
            None => false,
        }
    }

    pub fn reserve(&self, n: usize) {
        let mut table = self.table.write();
        if table.slots.len() >= n {
            return;
        }
        let new_cap = primes::prime_above(n as i64).unwrap_or(n as i64);
        table.rehash_to(new_cap);
    }

    pub fn cardinal(&self) -> usize {
        self.table.read().card
    }

    pub fn iterate(&self) -> Vec<ObjectRef> {
        self.table
            .read()
            .slots
            .iter()
            .filter_map(|s| match s {
                Slot::Occupied(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reify_as_set(&self) -> SetOb {
        SetOb::new(self.iterate().into_iter().map(Some).collect())
    }
}

impl Default for ObjectHashtablePayload {
    fn default() -> ObjectHashtablePayload {
        ObjectHashtablePayload::new()
    }
}

impl Payload for ObjectHashtablePayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::ObjectHashtable
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(tbl) = payload.as_any().downcast_ref::<ObjectHashtablePayload>() else {
        return;
    };
    for obj in tbl.iterate() {
        visit(&obj);
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(tbl) = payload.as_any().downcast_ref::<ObjectHashtablePayload>() else {
        return serde_json::Value::Null;
    };
    let elements: Vec<String> = tbl.iterate().iter().map(|o| o.to_string()).collect();
    serde_json::json!({ "payload": "object_hashtable", "elements": elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use refpersys_core::object::Runtime;

    #[test]
    fn add_remove_and_grow() {
        let rt = Runtime::new();
        let tbl = ObjectHashtablePayload::new();
        let objs: Vec<ObjectRef> = (0..200).map(|_| rt.create_object()).collect();
        for o in &objs {
            assert!(tbl.add(o.clone()));
        }
        assert_eq!(tbl.cardinal(), 200);
        for o in &objs {
            assert!(tbl.remove(o));
        }
        assert_eq!(tbl.cardinal(), 0);
    }

    #[test]
    fn reify_as_set_matches_membership() {
        let rt = Runtime::new();
        let tbl = ObjectHashtablePayload::new();
        let a = rt.create_object();
        let b = rt.create_object();
        tbl.add(a.clone());
        tbl.add(b.clone());
        assert_eq!(tbl.reify_as_set().cardinal(), 2);
    }
}
