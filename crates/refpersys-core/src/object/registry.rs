//! The global object registry (spec §4.5 "Global object registry" / §5
//! "Bucket locks"): 620 independently-locked, open-addressed buckets.
//!
//! Grounded on `examples/original_source/src/object_rps.c`'s bucket-array
//! registry and on `frankenlibc-membrane::arena`'s sharded-mutex design,
//! which partitions a fixed number of shards each behind their own lock
//! the same way.

use super::ObjectRef;
use crate::oid::{Oid, NB_BUCKETS};
use crate::primes;
use parking_lot::Mutex;

#[derive(Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(ObjectRef),
}

struct Bucket {
    slots: Vec<Slot>,
    card: usize,
}

impl Bucket {
    fn new(capacity: u64) -> Bucket {
        Bucket {
            slots: vec![Slot::Empty; capacity as usize],
            card: 0,
        }
    }

    fn is_nearly_full(&self) -> bool {
        let cap = self.slots.len();
        let empty = self.slots.iter().filter(|s| matches!(s, Slot::Empty)).count();
        self.card + 2 > cap || empty < cap / 4
    }

    fn probe_start(&self, oid: Oid) -> usize {
        ((oid.hi() ^ oid.lo()) % self.slots.len() as u64) as usize
    }

    fn find_index(&self, oid: Oid) -> Option<usize> {
        let cap = self.slots.len();
        let start = self.probe_start(oid);
        for step in 0..cap {
            let ix = (start + step) % cap;
            match &self.slots[ix] {
                Slot::Empty => return None,
                Slot::Occupied(o) if o.id() == oid => return Some(ix),
                Slot::Occupied(_) | Slot::Tombstone => continue,
            }
        }
        None
    }

    /// Inserts without checking for rehash; caller must have already
    /// rehashed if `is_nearly_full()`.
    fn insert_unchecked(&mut self, obj: ObjectRef) {
        let cap = self.slots.len();
        let start = self.probe_start(obj.id());
        for step in 0..cap {
            let ix = (start + step) % cap;
            if matches!(self.slots[ix], Slot::Empty | Slot::Tombstone) {
                self.slots[ix] = Slot::Occupied(obj);
                self.card += 1;
                return;
            }
        }
        crate::fatal!("object registry bucket has no free slot after rehash");
    }

    fn rehash(&mut self) {
        let new_cap = primes::prime_above((3 * self.card as i64) / 2 + (self.slots.len() as i64) / 8 + 6)
            .unwrap_or_else(|| crate::fatal!("object registry bucket cannot grow further"));
        let old = std::mem::replace(self, Bucket::new(new_cap as u64));
        for slot in old.slots {
            if let Slot::Occupied(obj) = slot {
                self.insert_unchecked(obj);
            }
        }
    }
}

/// The 620-bucket process-wide object table.
pub struct Registry {
    buckets: Vec<Mutex<Bucket>>,
}

impl Registry {
    pub fn new() -> Registry {
        let initial_capacity = primes::prime_above(7).unwrap_or(11);
        let buckets = (0..NB_BUCKETS)
            .map(|_| Mutex::new(Bucket::new(initial_capacity as u64)))
            .collect();
        Registry { buckets }
    }

    pub fn insert(&self, obj: ObjectRef) {
        let mut bucket = self.buckets[obj.id().bucket() as usize].lock();
        if bucket.find_index(obj.id()).is_some() {
            return;
        }
        if bucket.is_nearly_full() {
            bucket.rehash();
        }
        bucket.insert_unchecked(obj);
    }

    pub fn find(&self, oid: Oid) -> Option<ObjectRef> {
        let bucket = self.buckets[oid.bucket() as usize].lock();
        bucket.find_index(oid).and_then(|ix| match &bucket.slots[ix] {
            Slot::Occupied(o) => Some(o.clone()),
            _ => None,
        })
    }

    pub fn remove(&self, oid: Oid) -> bool {
        let mut bucket = self.buckets[oid.bucket() as usize].lock();
        match bucket.find_index(oid) {
            Some(ix) => {
                bucket.slots[ix] = Slot::Tombstone;
                bucket.card -= 1;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().card).sum()
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Runtime;

    fn object_with_oid(oid: Oid) -> ObjectRef {
        Runtime::new().ensure_object(oid)
    }

    #[test]
    fn insert_find_remove_roundtrip() {
        let reg = Registry::new();
        let obj = object_with_oid(Oid::random_valid());
        reg.insert(obj.clone());
        assert!(reg.find(obj.id()).is_some());
        assert!(reg.remove(obj.id()));
        assert!(reg.find(obj.id()).is_none());
    }

    #[test]
    fn surviving_a_thousand_inserts_of_the_same_oid_keeps_cardinality_one() {
        let reg = Registry::new();
        let oid = Oid::random_valid();
        for _ in 0..1000 {
            reg.remove(oid);
            reg.insert(object_with_oid(oid));
        }
        assert!(reg.find(oid).is_some());
    }

    #[test]
    fn repeated_insert_of_the_same_oid_without_a_remove_keeps_cardinality_one() {
        let reg = Registry::new();
        let oid = Oid::random_valid();
        reg.insert(object_with_oid(oid));
        reg.insert(object_with_oid(oid));
        reg.insert(object_with_oid(oid));
        assert_eq!(reg.len(), 1);
        assert!(reg.find(oid).is_some());
    }

    #[test]
    fn rehashing_preserves_all_members() {
        let reg = Registry::new();
        let objs: Vec<ObjectRef> = (0..500).map(|_| object_with_oid(Oid::random_valid())).collect();
        for o in &objs {
            reg.insert(o.clone());
        }
        for o in &objs {
            assert!(reg.find(o.id()).is_some());
        }
    }
}
