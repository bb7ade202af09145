//! Immutable sets-of-objects (spec §4.4 `Set`), sorted ascending by oid with
//! no duplicates.

use super::nonzero;
use crate::object::ObjectRef;

#[derive(Debug, Clone, PartialEq)]
pub struct SetOb {
    members: Vec<ObjectRef>,
    hash: u32,
}

impl SetOb {
    /// Filters nulls, sorts by oid, removes duplicates, then stamps a hash
    /// derived from the member oid hashes.
    pub fn new(candidates: Vec<Option<ObjectRef>>) -> SetOb {
        let mut members: Vec<ObjectRef> = candidates.into_iter().flatten().collect();
        members.sort_by_key(|o| o.id());
        members.dedup_by_key(|o| o.id());
        let hash = Self::mix_hash(&members);
        SetOb { members, hash }
    }

    pub fn cardinal(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[ObjectRef] {
        &self.members
    }

    /// `O(1)`.
    pub fn nth(&self, n: usize) -> Option<&ObjectRef> {
        self.members.get(n)
    }

    /// Hybrid binary search narrowing to a four-element window, then a
    /// linear sweep, mirroring the attribute table's `find` shape (spec
    /// §4.5) adapted to a plain sorted `Vec`. `O(log n)`.
    pub fn index_of(&self, target: &ObjectRef) -> Option<usize> {
        if self.members.is_empty() {
            return None;
        }
        let mut lo = 0i64;
        let mut hi = self.members.len() as i64 - 1;
        while lo + 4 < hi {
            let mid = (lo + hi) / 2;
            let cur = &self.members[mid as usize];
            if cur.id() == target.id() {
                return Some(mid as usize);
            } else if cur.id() < target.id() {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo..=hi).find(|&ix| self.members[ix as usize].id() == target.id())
            .map(|ix| ix as usize)
    }

    pub fn contains(&self, target: &ObjectRef) -> bool {
        self.index_of(target).is_some()
    }

    pub fn hash32(&self) -> u32 {
        self.hash
    }

    /// Commutative mix (xor of member hashes): a set's hash depends only on
    /// its (canonically sorted, deduplicated) membership.
    fn mix_hash(members: &[ObjectRef]) -> u32 {
        let h = members.iter().fold(0x5E70_0000u32, |acc, o| acc ^ o.id().hash32());
        nonzero(h)
    }
}
