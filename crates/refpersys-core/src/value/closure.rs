//! Closures (spec §4.4 `Closure`): a connective object, optional metadata,
//! an ordered vector of captured values, and Application — dispatching a
//! call through the connective's registered native routine.
//!
//! Grounded on `examples/original_source/src/composite_rps.c`'s
//! `rps_closure_apply_v`/`_vi`/`_twov`/`_dumpj` family: each locks the
//! connective, reads `ob_routsig`/`ob_routaddr`, and tail-calls through the
//! function pointer cast to the matching signature, falling back to a null
//! value when no routine address is set. This crate cannot carry a raw
//! function pointer as object state (there is no `ob_routaddr` field to
//! read under a lock), so the connective's oid is instead looked up in
//! `Runtime`'s routine table — the practical Rust analogue of "lock the
//! connective and read its routine address" — while the signature itself
//! is still read as an ordinary attribute off the connective, per the
//! resolution in SPEC_FULL.md §12.3.
//!
//! The C source's `rps_closure_apply_dumpj` is dumper-callback dispatch,
//! and itself calls `RPS_FATAL ("unimplemented rps_closure_apply_dumpj")` —
//! this crate carries the `DumpCallback` signature tag for completeness but
//! likewise never dispatches through it.

use super::{nonzero, Value};
use crate::object::{ObjectRef, Runtime};

/// The fixed family of native `apply` signatures a closure's connective may
/// be dispatched through (spec §4.4; exactly the four named in spec §9's
/// Open Question, matching `rps_closure_apply_v`/`_vi`/`_twov`/`_dumpj`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySignature {
    /// `rps_apply_v_sigt`: returns a single value.
    ValueReturning,
    /// `rps_apply_vi_sigt`: returns a value and an int.
    ValueAndInt,
    /// `rps_apply_twov_sigt`: returns two values.
    TwoValues,
    /// `rps_closure_apply_dumpj`: dumper-callback form; never dispatched
    /// (unimplemented in the source this is grounded on).
    DumpCallback,
}

impl ApplySignature {
    /// The code stored in the connective's `signature` attribute.
    pub fn to_code(self) -> i64 {
        match self {
            ApplySignature::ValueReturning => 0,
            ApplySignature::ValueAndInt => 1,
            ApplySignature::TwoValues => 2,
            ApplySignature::DumpCallback => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<ApplySignature> {
        match code {
            0 => Some(ApplySignature::ValueReturning),
            1 => Some(ApplySignature::ValueAndInt),
            2 => Some(ApplySignature::TwoValues),
            3 => Some(ApplySignature::DumpCallback),
            _ => None,
        }
    }
}

pub type ApplyValueFn = fn(&Runtime, &ClosureOb, &[Value]) -> Value;
pub type ApplyValueAndIntFn = fn(&Runtime, &ClosureOb, &[Value]) -> (Value, i64);
pub type ApplyTwoValuesFn = fn(&Runtime, &ClosureOb, &[Value]) -> (Value, Value);

/// A native routine registered for a connective object, keyed by the
/// connective's oid in `Runtime`'s routine table (see module docs).
#[derive(Clone, Copy)]
pub enum NativeRoutine {
    ValueReturning(ApplyValueFn),
    ValueAndInt(ApplyValueAndIntFn),
    TwoValues(ApplyTwoValuesFn),
}

impl NativeRoutine {
    pub fn signature(self) -> ApplySignature {
        match self {
            NativeRoutine::ValueReturning(_) => ApplySignature::ValueReturning,
            NativeRoutine::ValueAndInt(_) => ApplySignature::ValueAndInt,
            NativeRoutine::TwoValues(_) => ApplySignature::TwoValues,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureOb {
    connective: ObjectRef,
    metadata: Option<Value>,
    captured: Vec<Value>,
    hash: u32,
}

impl ClosureOb {
    pub fn new(connective: ObjectRef, metadata: Option<Value>, captured: Vec<Value>) -> ClosureOb {
        let hash = Self::mix_hash(&connective, &metadata, &captured);
        ClosureOb {
            connective,
            metadata,
            captured,
            hash,
        }
    }

    pub fn connective(&self) -> &ObjectRef {
        &self.connective
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn captured(&self) -> &[Value] {
        &self.captured
    }

    pub fn nb_captured(&self) -> usize {
        self.captured.len()
    }

    pub fn hash32(&self) -> u32 {
        self.hash
    }

    /// Application with a single returned value (spec §4.4 "Application",
    /// `rps_closure_apply_v`). Null-safe: no registered routine, or one
    /// registered under a different signature than the connective's
    /// `signature` attribute declares, yields `Value::Null`.
    pub fn apply_value(&self, rt: &Runtime, args: &[Value]) -> Value {
        match self.resolve_routine(rt) {
            Some(NativeRoutine::ValueReturning(f)) => f(rt, self, args),
            _ => Value::Null,
        }
    }

    /// Application returning a value and an int (`rps_closure_apply_vi`).
    pub fn apply_value_and_int(&self, rt: &Runtime, args: &[Value]) -> (Value, i64) {
        match self.resolve_routine(rt) {
            Some(NativeRoutine::ValueAndInt(f)) => f(rt, self, args),
            _ => (Value::Null, 0),
        }
    }

    /// Application returning two values (`rps_closure_apply_twov`).
    pub fn apply_two_values(&self, rt: &Runtime, args: &[Value]) -> (Value, Value) {
        match self.resolve_routine(rt) {
            Some(NativeRoutine::TwoValues(f)) => f(rt, self, args),
            _ => (Value::Null, Value::Null),
        }
    }

    /// Reads the connective's `signature` attribute and looks up its
    /// registered native routine, returning it only if the two agree.
    fn resolve_routine(&self, rt: &Runtime) -> Option<NativeRoutine> {
        let declared = match rt.get_attribute(&self.connective, &rt.signature_attribute()) {
            Value::Int(code) => ApplySignature::from_code(code)?,
            _ => return None,
        };
        let routine = rt.routine_for(&self.connective)?;
        (routine.signature() == declared).then_some(routine)
    }

    /// Order-sensitive mix of the connective's oid hash, the metadata's hash
    /// (a fixed constant when absent), and each capture's hash in turn.
    fn mix_hash(connective: &ObjectRef, metadata: &Option<Value>, captured: &[Value]) -> u32 {
        let meta_hash = metadata.as_ref().map(Value::hash32).unwrap_or(0x4D45_5441);
        let mut h = 0x434C_4F53u32 ^ connective.id().hash32();
        h = h.rotate_left(7) ^ meta_hash;
        for (ix, v) in captured.iter().enumerate() {
            h = h.rotate_left((ix % 29) as u32 + 1) ^ v.hash32();
        }
        nonzero(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Runtime;

    fn double_value_routine(_rt: &Runtime, closure: &ClosureOb, _args: &[Value]) -> Value {
        match closure.captured().first() {
            Some(Value::Int(n)) => Value::Int(n * 2),
            _ => Value::Null,
        }
    }

    #[test]
    fn apply_value_dispatches_through_the_registered_routine() {
        let rt = Runtime::new();
        let connective = rt.create_object();
        rt.register_routine(&connective, NativeRoutine::ValueReturning(double_value_routine));
        let closure = ClosureOb::new(connective, None, vec![Value::Int(21)]);
        assert_eq!(closure.apply_value(&rt, &[]).as_int(), Some(42));
    }

    #[test]
    fn apply_value_is_null_safe_without_a_registered_routine() {
        let rt = Runtime::new();
        let connective = rt.create_object();
        let closure = ClosureOb::new(connective, None, vec![Value::Int(21)]);
        assert!(closure.apply_value(&rt, &[]).is_null());
    }

    #[test]
    fn apply_falls_back_when_the_signature_attribute_disagrees_with_the_routine() {
        let rt = Runtime::new();
        let connective = rt.create_object();
        rt.register_routine(&connective, NativeRoutine::ValueReturning(double_value_routine));
        // Overwrite the signature attribute registration wrote, with a
        // mismatched signature.
        rt.put_attribute(&connective, rt.signature_attribute(), Value::Int(ApplySignature::TwoValues.to_code()));
        let closure = ClosureOb::new(connective, None, vec![Value::Int(21)]);
        assert!(closure.apply_value(&rt, &[]).is_null());
    }

    #[test]
    fn hash_depends_on_capture_order() {
        let rt = Runtime::new();
        let connective = rt.create_object();
        let a = ClosureOb::new(connective.clone(), None, vec![Value::Int(1), Value::Int(2)]);
        let b = ClosureOb::new(connective, None, vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(a.hash32(), b.hash32());
    }
}
