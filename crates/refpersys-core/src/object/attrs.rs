//! The attribute table (spec §4.5 "Attribute table"): a sorted array of
//! `(attribute-object, value)` pairs with copy-on-write `put`/`remove`.
//!
//! Grounded on `examples/original_source/src/object_rps.c`'s
//! `rps_object_put_attr`/`rps_object_get_attr` pair (binary search narrowing
//! to a small window, then linear sweep) and on the copy-on-write discipline
//! of `frankenlibc-membrane::arena`'s generation bump. Capacity tracking
//! mirrors `rps_attr_table_put`/`rps_attr_table_remove`: entries live in a
//! logical table sized to a ladder prime from [`crate::primes`], growing to
//! `prime_above(tbllen + 2 + tblsiz / 5)` once the table is full and
//! shrinking to `prime_above(tbllen - 1)` on removal only once the old
//! capacity exceeds 6 and occupancy falls under half.

use super::ObjectRef;
use crate::primes;
use crate::value::Value;
use std::cmp::Ordering;

/// An immutable, sorted-by-attribute-oid table. `put` and `remove` return a
/// new table; callers reassign the object's attribute slot to the result.
#[derive(Debug, Clone, Default)]
pub struct AttrTable {
    entries: Vec<(ObjectRef, Value)>,
    /// Logical capacity (a ladder prime), distinct from `entries.len()` —
    /// `put` only reallocates once `entries.len()` reaches this bound.
    capacity: i64,
}

impl AttrTable {
    pub fn empty() -> AttrTable {
        AttrTable { entries: Vec::new(), capacity: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The logical table capacity (a ladder prime, or 0 before the first
    /// `put`), tracked separately from occupancy for the grow/shrink rules.
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ObjectRef, Value)> {
        self.entries.iter()
    }

    /// Binary search narrowing to a four-element window, then a linear
    /// sweep over that window — the "apparent intent" fix for the
    /// suspect-at-small-sizes loop condition called out in spec §9.
    fn locate(&self, attr: &ObjectRef) -> Result<usize, usize> {
        if self.entries.is_empty() {
            return Err(0);
        }
        let mut lo = 0i64;
        let mut hi = self.entries.len() as i64 - 1;
        while lo + 4 < hi {
            let mid = (lo + hi) / 2;
            match self.entries[mid as usize].0.id().cmp(&attr.id()) {
                Ordering::Equal => return Ok(mid as usize),
                Ordering::Less => lo = mid,
                Ordering::Greater => hi = mid,
            }
        }
        for ix in lo..=hi {
            match self.entries[ix as usize].0.id().cmp(&attr.id()) {
                Ordering::Equal => return Ok(ix as usize),
                Ordering::Greater => return Err(ix as usize),
                Ordering::Less => continue,
            }
        }
        Err((hi + 1) as usize)
    }

    pub fn find(&self, attr: &ObjectRef) -> Option<&Value> {
        self.locate(attr).ok().map(|ix| &self.entries[ix].1)
    }

    /// Copy-on-write: a duplicate key is overwritten in place in the cloned
    /// table; a new key grows the table by one slot at its sorted position,
    /// reallocating to the next growth prime once occupancy reaches the
    /// table's current logical capacity. A null value is never stored —
    /// storing `Value::Null` is equivalent to removing the binding (spec
    /// §4.5 "ignores null values").
    pub fn put(&self, attr: ObjectRef, value: Value) -> AttrTable {
        if value.is_null() {
            return self.remove(&attr);
        }
        match self.locate(&attr) {
            Ok(ix) => {
                let mut entries = self.entries.clone();
                entries[ix] = (attr, value);
                AttrTable { entries, capacity: self.capacity }
            }
            Err(ix) => {
                let mut entries = self.entries.clone();
                entries.insert(ix, (attr, value));
                let capacity = if (self.entries.len() as i64) < self.capacity {
                    self.capacity
                } else {
                    let want = self.entries.len() as i64 + 2 + self.capacity / 5;
                    primes::prime_above(want).unwrap_or_else(|| crate::fatal!("attribute table cannot grow further"))
                };
                AttrTable { entries, capacity }
            }
        }
    }

    /// Removes `attr`'s binding if present, possibly shrinking the logical
    /// capacity to the next growth prime below half of the pre-removal
    /// capacity — but only once that capacity exceeds 6, matching
    /// `rps_attr_table_remove`'s "perhaps shrink" guard.
    pub fn remove(&self, attr: &ObjectRef) -> AttrTable {
        let Ok(ix) = self.locate(attr) else {
            return self.clone();
        };
        let mut entries = self.entries.clone();
        entries.remove(ix);
        let old_len = self.entries.len() as i64;
        let mut capacity = self.capacity;
        if self.capacity > 6 && old_len < self.capacity / 2 {
            if let Some(candidate) = primes::prime_above(old_len - 1) {
                if candidate < self.capacity {
                    capacity = candidate;
                }
            }
        }
        AttrTable { entries, capacity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Runtime;

    fn attr(rt: &Runtime) -> ObjectRef {
        rt.create_object()
    }

    #[test]
    fn put_then_find_roundtrips_and_bounds_growth() {
        let rt = Runtime::new();
        let t0 = AttrTable::empty();
        let a1 = attr(&rt);
        let a2 = attr(&rt);
        let t1 = t0.put(a1.clone(), Value::Int(7));
        let t2 = t1.put(a2.clone(), Value::Int(8));
        assert_eq!(t2.find(&a1), Some(&Value::Int(7)));
        assert_eq!(t2.find(&a2), Some(&Value::Int(8)));
        assert!((t1.len()..=t1.len() + 1).contains(&t2.len()));
    }

    #[test]
    fn remove_after_put_is_extensionally_the_original_when_absent_before() {
        let rt = Runtime::new();
        let t0 = AttrTable::empty();
        let a = attr(&rt);
        let t1 = t0.put(a.clone(), Value::Int(1)).remove(&a);
        assert!(t1.find(&a).is_none());
        assert_eq!(t1.len(), t0.len());
    }

    #[test]
    fn put_with_null_value_is_a_remove() {
        let rt = Runtime::new();
        let a = attr(&rt);
        let t = AttrTable::empty().put(a.clone(), Value::Int(1)).put(a.clone(), Value::Null);
        assert!(t.find(&a).is_none());
    }

    #[test]
    fn scales_past_the_small_window_fast_path() {
        let rt = Runtime::new();
        let mut attrs: Vec<ObjectRef> = (0..64).map(|_| attr(&rt)).collect();
        attrs.sort_by_key(|o| o.id());
        let mut table = AttrTable::empty();
        for (ix, a) in attrs.iter().enumerate() {
            table = table.put(a.clone(), Value::Int(ix as i64));
        }
        for (ix, a) in attrs.iter().enumerate() {
            assert_eq!(table.find(a), Some(&Value::Int(ix as i64)));
        }
    }

    #[test]
    fn capacity_grows_by_prime_steps_and_never_falls_behind_occupancy() {
        let rt = Runtime::new();
        let mut attrs: Vec<ObjectRef> = (0..40).map(|_| attr(&rt)).collect();
        attrs.sort_by_key(|o| o.id());
        let mut table = AttrTable::empty();
        for a in &attrs {
            let before_capacity = table.capacity();
            table = table.put(a.clone(), Value::Int(1));
            assert!(table.capacity() >= before_capacity);
            assert!((table.len() as i64) <= table.capacity());
        }
    }

    #[test]
    fn a_small_table_never_exceeds_the_six_entry_shrink_floor() {
        let rt = Runtime::new();
        let a1 = attr(&rt);
        let a2 = attr(&rt);
        let t = AttrTable::empty().put(a1.clone(), Value::Int(1)).put(a2.clone(), Value::Int(2));
        assert!(t.capacity() <= 6);
        let t = t.remove(&a1);
        assert!(t.find(&a1).is_none());
        assert_eq!(t.find(&a2), Some(&Value::Int(2)));
    }

    #[test]
    fn a_large_table_shrinks_once_occupancy_falls_under_half_capacity() {
        let rt = Runtime::new();
        let mut attrs: Vec<ObjectRef> = (0..40).map(|_| attr(&rt)).collect();
        attrs.sort_by_key(|o| o.id());
        let mut table = AttrTable::empty();
        for a in &attrs {
            table = table.put(a.clone(), Value::Int(1));
        }
        let peak_capacity = table.capacity();
        assert!(peak_capacity > 6);
        for a in attrs.iter().take(35) {
            table = table.remove(a);
        }
        assert!(table.capacity() < peak_capacity);
        for a in attrs.iter().skip(35) {
            assert!(table.find(a).is_some());
        }
    }
}
