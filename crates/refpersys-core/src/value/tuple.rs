//! Immutable tuples-of-objects (spec §4.4 `Tuple`).

use super::nonzero;
use crate::object::ObjectRef;

/// An immutable, insertion-ordered tuple of (possibly null) object
/// components.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleOb {
    components: Vec<Option<ObjectRef>>,
    hash: u32,
}

impl TupleOb {
    /// Copies `components` verbatim (null slots allowed, order preserved).
    pub fn new(components: Vec<Option<ObjectRef>>) -> TupleOb {
        let hash = Self::mix_hash(&components);
        TupleOb { components, hash }
    }

    pub fn arity(&self) -> usize {
        self.components.len()
    }

    /// `nth(k)` for `0 <= k < arity` is `components[k]`; for
    /// `-arity <= k < 0` it is `components[arity + k]`; otherwise `None`.
    pub fn nth(&self, k: i64) -> Option<&ObjectRef> {
        let arity = self.components.len() as i64;
        let ix = if k >= 0 { k } else { k + arity };
        if ix < 0 || ix >= arity {
            return None;
        }
        self.components[ix as usize].as_ref()
    }

    pub fn hash32(&self) -> u32 {
        self.hash
    }

    /// Order-sensitive mix: each position rotates the accumulator by its
    /// index before folding in the component's oid hash (or a fixed
    /// constant for a null slot), so permuting components changes the hash.
    fn mix_hash(components: &[Option<ObjectRef>]) -> u32 {
        let h = components.iter().enumerate().fold(0x7055_0000u32, |acc, (ix, c)| {
            let component_hash = c.as_ref().map(|o| o.id().hash32()).unwrap_or(0x4E55_4C4C);
            (acc.rotate_left((ix % 29) as u32 + 1)) ^ component_hash
        });
        nonzero(h)
    }
}
