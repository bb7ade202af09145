//! Deque payload: a doubly-linked list of fixed-capacity chunks
//! (spec §4.6 "Deque chunks of fixed capacity 8 are the unit of link
//! allocation").
//!
//! Grounded on `examples/original_source/src/composite_rps.c`'s
//! `rps_payldeque_push_first`/`push_last`/`pop_first`/`pop_last`, which
//! allocate a new `RPS_DEQUE_CHUNKSIZE`-slot link when the end chunk is
//! full and free a chunk once it empties. This crate models each chunk as
//! a packed `Vec<ObjectRef>` capped at [`DEQUE_CHUNK_SIZE`] rather than a
//! fixed array with holes — the source immediately compacts a chunk's
//! occupied slots to the front on every push, so a packed `Vec` is
//! behaviorally identical and avoids an unsafe fixed-size-array-of-Option
//! dance.

use parking_lot::RwLock;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use std::any::Any;
use std::collections::VecDeque;

/// The fixed chunk capacity named in spec §4.6.
pub const DEQUE_CHUNK_SIZE: usize = 8;

pub struct DequePayload {
    chunks: RwLock<VecDeque<Vec<ObjectRef>>>,
}

impl DequePayload {
    pub fn new() -> DequePayload {
        DequePayload {
            chunks: RwLock::new(VecDeque::new()),
        }
    }

    pub fn push_first(&self, obj: ObjectRef) {
        let mut chunks = self.chunks.write();
        match chunks.front_mut() {
            Some(front) if front.len() < DEQUE_CHUNK_SIZE => front.insert(0, obj),
            _ => chunks.push_front(vec![obj]),
        }
    }

    pub fn push_last(&self, obj: ObjectRef) {
        let mut chunks = self.chunks.write();
        match chunks.back_mut() {
            Some(back) if back.len() < DEQUE_CHUNK_SIZE => back.push(obj),
            _ => chunks.push_back(vec![obj]),
        }
    }

    pub fn pop_first(&self) -> Option<ObjectRef> {
        let mut chunks = self.chunks.write();
        let front = chunks.front_mut()?;
        let obj = front.remove(0);
        if front.is_empty() {
            chunks.pop_front();
        }
        Some(obj)
    }

    pub fn pop_last(&self) -> Option<ObjectRef> {
        let mut chunks = self.chunks.write();
        let back = chunks.back_mut()?;
        let obj = back.pop().expect("non-empty chunk invariant");
        if back.is_empty() {
            chunks.pop_back();
        }
        Some(obj)
    }

    pub fn get_first(&self) -> Option<ObjectRef> {
        self.chunks.read().front().and_then(|c| c.first()).cloned()
    }

    pub fn get_last(&self) -> Option<ObjectRef> {
        self.chunks.read().back().and_then(|c| c.last()).cloned()
    }

    pub fn length(&self) -> usize {
        self.chunks.read().iter().map(Vec::len).sum()
    }

    pub fn nb_chunks(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn nth(&self, n: usize) -> Option<ObjectRef> {
        let mut remaining = n;
        for chunk in self.chunks.read().iter() {
            if remaining < chunk.len() {
                return Some(chunk[remaining].clone());
            }
            remaining -= chunk.len();
        }
        None
    }

    fn all(&self) -> Vec<ObjectRef> {
        self.chunks.read().iter().flatten().cloned().collect()
    }
}

impl Default for DequePayload {
    fn default() -> DequePayload {
        DequePayload::new()
    }
}

impl Payload for DequePayload {
    fn type_tag(&self) -> PayloadTag {
        PayloadTag::Deque
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn dump_scanner(payload: &dyn Payload, visit: &mut dyn FnMut(&ObjectRef)) {
    let Some(deque) = payload.as_any().downcast_ref::<DequePayload>() else {
        return;
    };
    for obj in deque.all() {
        visit(&obj);
    }
}

pub fn dump_serializer(payload: &dyn Payload) -> serde_json::Value {
    let Some(deque) = payload.as_any().downcast_ref::<DequePayload>() else {
        return serde_json::Value::Null;
    };
    let elements: Vec<String> = deque.all().iter().map(|o| o.to_string()).collect();
    serde_json::json!({ "payload": "deque", "elements": elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use refpersys_core::object::Runtime;

    #[test]
    fn nine_pushes_last_fill_two_chunks() {
        let rt = Runtime::new();
        let deque = DequePayload::new();
        for _ in 0..9 {
            deque.push_last(rt.create_object());
        }
        assert_eq!(deque.length(), 9);
        assert_eq!(deque.nb_chunks(), 2);
    }

    #[test]
    fn eight_pops_first_leave_one_chunk_with_one_element() {
        let rt = Runtime::new();
        let deque = DequePayload::new();
        let objs: Vec<ObjectRef> = (0..9).map(|_| rt.create_object()).collect();
        for o in &objs {
            deque.push_last(o.clone());
        }
        for _ in 0..8 {
            deque.pop_first();
        }
        assert_eq!(deque.nb_chunks(), 1);
        assert_eq!(deque.length(), 1);
        assert_eq!(deque.get_first().unwrap().id(), objs[8].id());
    }

    #[test]
    fn push_first_preserves_lifo_order_within_a_chunk() {
        let rt = Runtime::new();
        let deque = DequePayload::new();
        let a = rt.create_object();
        let b = rt.create_object();
        deque.push_first(a.clone());
        deque.push_first(b.clone());
        assert_eq!(deque.get_first().unwrap().id(), b.id());
        assert_eq!(deque.pop_first().unwrap().id(), b.id());
        assert_eq!(deque.pop_first().unwrap().id(), a.id());
    }
}
