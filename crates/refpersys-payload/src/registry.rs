//! The process-wide payload-kind callback registry (spec §4.6 / §5
//! "Payload-registry lock"): each kind registers a remover, a dump
//! scanner and a dump serializer at process start; the lock guarding the
//! table is held only briefly and never while calling into user code.
//!
//! Grounded on `examples/original_source/src/composite_rps.c`'s per-kind
//! `..._payload_remover`/`..._payload_dump_scanner`/
//! `..._payload_dump_serializer` triples, and on
//! `frankenlibc-membrane::arena`'s free-list callback table for the
//! single-lock, short-critical-section shape.

use parking_lot::Mutex;
use refpersys_core::object::{ObjectRef, Payload, PayloadTag};
use std::collections::HashMap;

/// Invoked when a payload is detached, before the replacement is
/// installed or the owner is reclaimed.
pub type Remover = fn(&dyn Payload, owner: &ObjectRef);
/// Extends the dump reachability set by visiting every object the
/// payload references.
pub type DumpScanner = fn(&dyn Payload, visit: &mut dyn FnMut(&ObjectRef));
/// Emits the payload's kind-specific JSON fields for a space-file record.
pub type DumpSerializer = fn(&dyn Payload) -> serde_json::Value;

/// A type alias kept for readability at call sites; the registry's key
/// type is `refpersys_core::object::PayloadTag`.
pub type PayloadKindName = PayloadTag;

#[derive(Clone, Copy, Default)]
struct Callbacks {
    remover: Option<Remover>,
    scanner: Option<DumpScanner>,
    serializer: Option<DumpSerializer>,
}

pub struct PayloadRegistry {
    callbacks: Mutex<HashMap<PayloadTag, Callbacks>>,
}

impl PayloadRegistry {
    pub fn new() -> PayloadRegistry {
        PayloadRegistry {
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        kind: PayloadTag,
        remover: Option<Remover>,
        scanner: Option<DumpScanner>,
        serializer: Option<DumpSerializer>,
    ) {
        let mut table = self.callbacks.lock();
        table.insert(
            kind,
            Callbacks {
                remover,
                scanner,
                serializer,
            },
        );
    }

    pub fn remover_for(&self, kind: PayloadTag) -> Option<Remover> {
        self.callbacks.lock().get(&kind).and_then(|c| c.remover)
    }

    pub fn scanner_for(&self, kind: PayloadTag) -> Option<DumpScanner> {
        self.callbacks.lock().get(&kind).and_then(|c| c.scanner)
    }

    pub fn serializer_for(&self, kind: PayloadTag) -> Option<DumpSerializer> {
        self.callbacks.lock().get(&kind).and_then(|c| c.serializer)
    }

    /// The payload kinds currently registered, for `--show-types`-style
    /// introspection.
    pub fn registered_kinds(&self) -> Vec<PayloadTag> {
        self.callbacks.lock().keys().copied().collect()
    }

    /// Registers the remover/scanner/serializer triple for every payload
    /// kind defined in this crate. Called once during `Runtime`
    /// initialization (spec §5 "Process-wide lifecycle").
    pub fn register_builtin_kinds(&self) {
        self.register(
            PayloadTag::MutableSet,
            Some(crate::mutable_set::remover),
            Some(crate::mutable_set::dump_scanner),
            Some(crate::mutable_set::dump_serializer),
        );
        self.register(
            PayloadTag::StringDict,
            Some(crate::string_dict::remover),
            Some(crate::string_dict::dump_scanner),
            Some(crate::string_dict::dump_serializer),
        );
        self.register(
            PayloadTag::Deque,
            None,
            Some(crate::deque::dump_scanner),
            Some(crate::deque::dump_serializer),
        );
        self.register(
            PayloadTag::ObjectHashtable,
            None,
            Some(crate::object_hashtable::dump_scanner),
            Some(crate::object_hashtable::dump_serializer),
        );
        self.register(
            PayloadTag::ClassInfo,
            None,
            Some(crate::class_info::dump_scanner),
            Some(crate::class_info::dump_serializer),
        );
        self.register(
            PayloadTag::Symbol,
            None,
            Some(crate::symbol::dump_scanner),
            Some(crate::symbol::dump_serializer),
        );
        self.register(
            PayloadTag::Space,
            None,
            Some(crate::space::dump_scanner),
            Some(crate::space::dump_serializer),
        );
    }
}

impl Default for PayloadRegistry {
    fn default() -> PayloadRegistry {
        PayloadRegistry::new()
    }
}
