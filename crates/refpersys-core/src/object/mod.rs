//! The mutable object core (spec §3 "Object" / §4.5 "Object core"): a
//! per-object recursive lock guarding class, space, attributes, components
//! and payload, plus the [`Runtime`] handle that owns the global registry,
//! the global-roots set and the distinguished class roots.
//!
//! Grounded on `examples/original_source/src/object_rps.c` for the field
//! layout and operation contracts, and on `frankenlibc-membrane::arena`'s
//! use of `parking_lot` for its sharded-mutex arena for the choice of lock
//! primitive — `parking_lot::ReentrantMutex` is the direct analogue of the
//! source's recursive `pthread_mutex_t`.

mod attrs;
mod registry;

pub use attrs::AttrTable;

use crate::oid::Oid;
use crate::primes;
use crate::value::Value;
use parking_lot::{Mutex, ReentrantMutex};
use registry::Registry;
use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A component vector never grows past this many slots (spec §4.5).
pub const MAX_COMPONENTS: usize = 1_000_000;

/// The kind of a payload attached to an object (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadTag {
    Symbol,
    ClassInfo,
    MutableSet,
    Deque,
    ObjectHashtable,
    StringDict,
    Space,
}

/// A payload is an owned, kind-specific region attached to exactly one
/// object (spec §3 "Payload ownership"). Concrete payload kinds live in
/// `refpersys-payload`, which implements this trait so `refpersys-core`
/// never needs to know about their internals.
pub trait Payload: Send + Sync {
    fn type_tag(&self) -> PayloadTag;

    fn as_any(&self) -> &dyn Any;

    /// Invoked on the outgoing payload before a replacement is installed,
    /// or when the owner is reclaimed.
    fn on_detach(&self, _owner: &ObjectRef) {}

    /// Class-info payloads override this to name their superclass; every
    /// other kind has no superclass.
    fn class_super(&self) -> Option<ObjectRef> {
        None
    }

    /// Class-info payloads override this to resolve a selector in their
    /// method dictionary.
    fn class_lookup_method(&self, _selector: &ObjectRef) -> Option<Value> {
        None
    }
}

struct ObjectState {
    class: Option<ObjectRef>,
    space: Option<ObjectRef>,
    mtime: u64,
    attrs: AttrTable,
    components: Vec<Value>,
    payload: Option<Box<dyn Payload>>,
}

/// A mutable object, keyed by its oid, guarded by a single recursive lock
/// (spec §5 "Per-object recursive lock").
pub struct Object {
    id: Oid,
    state: ReentrantMutex<RefCell<ObjectState>>,
}

impl Object {
    fn new(id: Oid, class: ObjectRef) -> ObjectRef {
        ObjectRef(Arc::new(Object {
            id,
            state: ReentrantMutex::new(RefCell::new(ObjectState {
                class: Some(class),
                space: None,
                mtime: 0,
                attrs: AttrTable::empty(),
                components: Vec::new(),
                payload: None,
            })),
        }))
    }

    /// Builds an object whose class is itself, for bootstrapping the
    /// distinguished class roots (spec §3: the "object" root is created
    /// before any class object exists to assign it one).
    fn new_self_classed(id: Oid) -> ObjectRef {
        let obj = ObjectRef(Arc::new(Object {
            id,
            state: ReentrantMutex::new(RefCell::new(ObjectState {
                class: None,
                space: None,
                mtime: 0,
                attrs: AttrTable::empty(),
                components: Vec::new(),
                payload: None,
            })),
        }));
        obj.set_class(obj.clone());
        obj
    }
}

/// A cheaply-cloned, reference-counted handle to an [`Object`]. Equality,
/// ordering and hashing all forward to the oid, matching the
/// identity-by-oid discipline of spec §3.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    pub fn id(&self) -> Oid {
        self.0.id
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ObjectState) -> R) -> R {
        let guard = self.0.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// The object's class. Fatal if the class was never filled in — a
    /// classless object is a programming-invariant violation (spec §7).
    pub fn class(&self) -> ObjectRef {
        match self.with_state(|s| s.class.clone()) {
            Some(c) => c,
            None => crate::fatal!("classless object {}", self.id()),
        }
    }

    pub fn set_class(&self, class: ObjectRef) {
        self.with_state(|s| s.class = Some(class));
    }

    pub fn space(&self) -> Option<ObjectRef> {
        self.with_state(|s| s.space.clone())
    }

    pub fn set_space(&self, space: Option<ObjectRef>) {
        self.with_state(|s| s.space = space);
    }

    pub fn mtime(&self) -> u64 {
        self.with_state(|s| s.mtime)
    }

    pub fn touch(&self, now: u64) {
        self.with_state(|s| s.mtime = now);
    }

    pub fn nb_attributes(&self) -> usize {
        self.with_state(|s| s.attrs.len())
    }

    /// Raw attribute access, with no class/space special-casing — callers
    /// that need the special cases go through [`Runtime::get_attribute`].
    pub fn raw_get_attribute(&self, attr: &ObjectRef) -> Value {
        self.with_state(|s| s.attrs.find(attr).cloned()).unwrap_or(Value::Null)
    }

    pub fn raw_put_attribute(&self, attr: ObjectRef, value: Value) {
        self.with_state(|s| s.attrs = s.attrs.put(attr, value));
    }

    pub fn remove_attribute(&self, attr: &ObjectRef) {
        self.with_state(|s| s.attrs = s.attrs.remove(attr));
    }

    pub fn attributes(&self) -> Vec<(ObjectRef, Value)> {
        self.with_state(|s| s.attrs.iter().cloned().collect())
    }

    pub fn nb_components(&self) -> usize {
        self.with_state(|s| s.components.len())
    }

    /// Negative `ix` counts from the end; out-of-range yields `Value::Null`
    /// rather than a fault (spec §7 "Argument validation").
    pub fn get_component(&self, ix: i64) -> Value {
        self.with_state(|s| {
            let n = s.components.len() as i64;
            let real = if ix >= 0 { ix } else { ix + n };
            if real < 0 || real >= n {
                Value::Null
            } else {
                s.components[real as usize].clone()
            }
        })
    }

    pub fn set_component(&self, ix: usize, value: Value) {
        self.with_state(|s| {
            if ix < s.components.len() {
                s.components[ix] = value;
            }
        });
    }

    pub fn components(&self) -> Vec<Value> {
        self.with_state(|s| s.components.clone())
    }

    pub fn push_component(&self, value: Value) {
        self.with_state(|s| {
            if s.components.len() >= MAX_COMPONENTS {
                crate::fatal!("component vector already at MAX_COMPONENTS");
            }
            s.components.push(value);
        });
    }

    /// Ensures room for at least `n` components, growing by the prime
    /// chosen from `n + oldN/3 + n/8 + 3` (spec §4.5), capped at
    /// [`MAX_COMPONENTS`].
    pub fn reserve_components(&self, n: usize) {
        self.with_state(|s| {
            if s.components.capacity() >= n {
                return;
            }
            let old_n = s.components.len() as i64;
            let target = n as i64 + old_n / 3 + (n as i64) / 8 + 3;
            let grown = primes::prime_above(target).unwrap_or(n as i64).max(n as i64) as usize;
            if grown > MAX_COMPONENTS {
                crate::fatal!("component vector cannot grow past MAX_COMPONENTS");
            }
            let extra = grown.saturating_sub(s.components.len());
            s.components.reserve(extra);
        });
    }

    /// Installs a new payload, invoking the outgoing payload's remover
    /// first (spec §3 "Payload ownership").
    pub fn put_payload(&self, payload: Box<dyn Payload>) {
        let outgoing = self.with_state(|s| s.payload.replace(payload));
        if let Some(old) = outgoing {
            old.on_detach(self);
        }
    }

    pub fn clear_payload(&self) {
        let outgoing = self.with_state(|s| s.payload.take());
        if let Some(old) = outgoing {
            old.on_detach(self);
        }
    }

    pub fn payload_tag(&self) -> Option<PayloadTag> {
        self.with_state(|s| s.payload.as_ref().map(|p| p.type_tag()))
    }

    /// Grants a closure read access to the payload trait object, for
    /// kind-specific downcasting (`payload.as_any().downcast_ref::<T>()`)
    /// without exposing the lock or the `Box`.
    pub fn with_payload<R>(&self, f: impl FnOnce(Option<&dyn Payload>) -> R) -> R {
        self.with_state(|s| f(s.payload.as_deref()))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ObjectRef {}

impl PartialOrd for ObjectRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectRef({})", self.id())
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Process-wide handle owning the global object registry, the global-roots
/// set and the distinguished class/attribute roots (spec §9 "Global
/// mutable state": "expose them as an explicit `Runtime` handle threaded
/// through operations, not as ambient globals").
pub struct Runtime {
    registry: Registry,
    global_roots: Mutex<BTreeSet<Oid>>,
    object_class: ObjectRef,
    class_class: ObjectRef,
    int_class: ObjectRef,
    double_class: ObjectRef,
    string_class: ObjectRef,
    tuple_class: ObjectRef,
    set_class: ObjectRef,
    closure_class: ObjectRef,
    json_class: ObjectRef,
    class_attr: ObjectRef,
    space_attr: ObjectRef,
    signature_attr: ObjectRef,
    routines: Mutex<std::collections::HashMap<Oid, crate::value::NativeRoutine>>,
}

impl Runtime {
    pub fn new() -> Runtime {
        let registry = Registry::new();

        let object_class = Object::new_self_classed(Oid::random_valid());
        let class_class = Object::new_self_classed(Oid::random_valid());
        object_class.set_class(class_class.clone());

        let new_kind_class = || Object::new(Oid::random_valid(), class_class.clone());
        let int_class = new_kind_class();
        let double_class = new_kind_class();
        let string_class = new_kind_class();
        let tuple_class = new_kind_class();
        let set_class = new_kind_class();
        let closure_class = new_kind_class();
        let json_class = new_kind_class();
        let class_attr = Object::new(Oid::random_valid(), object_class.clone());
        let space_attr = Object::new(Oid::random_valid(), object_class.clone());
        let signature_attr = Object::new(Oid::random_valid(), object_class.clone());

        for root in [
            &object_class,
            &class_class,
            &int_class,
            &double_class,
            &string_class,
            &tuple_class,
            &set_class,
            &closure_class,
            &json_class,
            &class_attr,
            &space_attr,
            &signature_attr,
        ] {
            registry.insert((*root).clone());
        }

        Runtime {
            registry,
            global_roots: Mutex::new(BTreeSet::new()),
            object_class,
            class_class,
            int_class,
            double_class,
            string_class,
            tuple_class,
            set_class,
            closure_class,
            json_class,
            class_attr,
            space_attr,
            signature_attr,
            routines: Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn create_object(&self) -> ObjectRef {
        let obj = Object::new(Oid::random_valid(), self.object_class.clone());
        self.registry.insert(obj.clone());
        obj
    }

    /// Returns the existing object for `oid`, or creates one with the
    /// temporary "object" class (spec §4.7 "create-objects"): the loader's
    /// first pass calls this for every oid it sees so forward references
    /// resolve immediately, regardless of visitation order.
    pub fn ensure_object(&self, oid: Oid) -> ObjectRef {
        if let Some(existing) = self.registry.find(oid) {
            return existing;
        }
        let obj = Object::new(oid, self.object_class.clone());
        self.registry.insert(obj.clone());
        obj
    }

    pub fn find(&self, oid: Oid) -> Option<ObjectRef> {
        self.registry.find(oid)
    }

    pub fn nb_objects(&self) -> usize {
        self.registry.len()
    }

    pub fn object_class(&self) -> ObjectRef {
        self.object_class.clone()
    }

    pub fn class_class(&self) -> ObjectRef {
        self.class_class.clone()
    }

    pub fn class_attribute(&self) -> ObjectRef {
        self.class_attr.clone()
    }

    pub fn space_attribute(&self) -> ObjectRef {
        self.space_attr.clone()
    }

    /// The distinguished attribute a closure's connective stores its
    /// [`crate::value::ApplySignature`] code under (spec §4.4 / §9 Open
    /// Question, resolved in SPEC_FULL.md §12.3).
    pub fn signature_attribute(&self) -> ObjectRef {
        self.signature_attr.clone()
    }

    /// Registers a native routine for `connective`, and stamps its
    /// `signature` attribute to match (spec §4.4 "Application": lock the
    /// connective, set its routine-signature and routine address).
    pub fn register_routine(&self, connective: &ObjectRef, routine: crate::value::NativeRoutine) {
        self.put_attribute(connective, self.signature_attr.clone(), Value::Int(routine.signature().to_code()));
        self.routines.lock().insert(connective.id(), routine);
    }

    /// Looks up the native routine registered for `connective`'s oid, the
    /// practical analogue of locking the connective and reading its
    /// `ob_routaddr` field.
    pub fn routine_for(&self, connective: &ObjectRef) -> Option<crate::value::NativeRoutine> {
        self.routines.lock().get(&connective.id()).copied()
    }

    /// The distinguished per-variant-kind class root for a value (spec
    /// §4.5 "The class of non-object values is a per-variant-kind
    /// distinguished root object").
    pub fn class_for_value(&self, value: &Value) -> ObjectRef {
        match value {
            Value::Int(_) => self.int_class.clone(),
            Value::Null => self.object_class.clone(),
            Value::Double(_) => self.double_class.clone(),
            Value::Str(_) => self.string_class.clone(),
            Value::Json(_) => self.json_class.clone(),
            Value::Tuple(_) => self.tuple_class.clone(),
            Value::Set(_) => self.set_class.clone(),
            Value::Closure(_) => self.closure_class.clone(),
            Value::Object(o) => o.class(),
        }
    }

    /// `get-attribute`, special-casing the class and space attribute
    /// objects (spec §4.5).
    pub fn get_attribute(&self, obj: &ObjectRef, attr: &ObjectRef) -> Value {
        if attr.id() == self.class_attr.id() {
            return Value::Object(obj.class());
        }
        if attr.id() == self.space_attr.id() {
            return obj.space().map(Value::Object).unwrap_or(Value::Null);
        }
        obj.raw_get_attribute(attr)
    }

    /// `put-attribute`: same special cases; only object-typed values are
    /// accepted for class/space, and null values are never stored.
    pub fn put_attribute(&self, obj: &ObjectRef, attr: ObjectRef, value: Value) {
        if value.is_null() {
            obj.remove_attribute(&attr);
            return;
        }
        if attr.id() == self.class_attr.id() {
            if let Value::Object(c) = &value {
                obj.set_class(c.clone());
            }
            return;
        }
        if attr.id() == self.space_attr.id() {
            if let Value::Object(s) = &value {
                obj.set_space(Some(s.clone()));
            }
            return;
        }
        obj.raw_put_attribute(attr, value);
    }

    /// Walks the class-super chain looking up `selector` in each class's
    /// method dictionary, capped at 100 levels (spec §4.5 "Method
    /// dispatch").
    pub fn dispatch_method(&self, receiver_class: ObjectRef, selector: &ObjectRef) -> Option<Value> {
        let mut cur = Some(receiver_class);
        let mut depth = 0;
        while let Some(class) = cur {
            if depth >= 100 {
                crate::fatal!("method dispatch exceeded 100 class levels, probable cycle");
            }
            if let Some(method) = class.with_payload(|p| p.and_then(|pl| pl.class_lookup_method(selector))) {
                return Some(method);
            }
            cur = class.with_payload(|p| p.and_then(|pl| pl.class_super()));
            depth += 1;
        }
        None
    }

    pub fn add_global_root(&self, obj: &ObjectRef) {
        self.global_roots.lock().insert(obj.id());
    }

    pub fn remove_global_root(&self, oid: Oid) {
        self.global_roots.lock().remove(&oid);
    }

    pub fn is_global_root(&self, oid: Oid) -> bool {
        self.global_roots.lock().contains(&oid)
    }

    pub fn global_roots(&self) -> Vec<Oid> {
        self.global_roots.lock().iter().copied().collect()
    }
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_object_has_the_object_class_and_is_registered() {
        let rt = Runtime::new();
        let obj = rt.create_object();
        assert_eq!(obj.class().id(), rt.object_class().id());
        assert!(rt.find(obj.id()).is_some());
    }

    #[test]
    fn attribute_special_cases_reach_class_and_space() {
        let rt = Runtime::new();
        let obj = rt.create_object();
        let new_class = rt.create_object();
        rt.put_attribute(&obj, rt.class_attribute(), Value::Object(new_class.clone()));
        assert_eq!(obj.class().id(), new_class.id());
        match rt.get_attribute(&obj, &rt.class_attribute()) {
            Value::Object(c) => assert_eq!(c.id(), new_class.id()),
            other => panic!("expected object value, got {other:?}"),
        }
    }

    #[test]
    fn put_attribute_ignores_non_object_class_values() {
        let rt = Runtime::new();
        let obj = rt.create_object();
        let original_class = obj.class();
        rt.put_attribute(&obj, rt.class_attribute(), Value::Int(42));
        assert_eq!(obj.class().id(), original_class.id());
    }

    #[test]
    fn component_negative_indexing_and_growth() {
        let rt = Runtime::new();
        let obj = rt.create_object();
        obj.push_component(Value::Int(1));
        obj.push_component(Value::Int(2));
        obj.push_component(Value::Int(3));
        assert_eq!(obj.get_component(-1).as_int(), Some(3));
        assert!(obj.get_component(5).is_null());
        obj.reserve_components(64);
        assert_eq!(obj.nb_components(), 3);
    }

    #[test]
    fn global_roots_track_membership() {
        let rt = Runtime::new();
        let obj = rt.create_object();
        assert!(!rt.is_global_root(obj.id()));
        rt.add_global_root(&obj);
        assert!(rt.is_global_root(obj.id()));
        rt.remove_global_root(obj.id());
        assert!(!rt.is_global_root(obj.id()));
    }
}
