//! # refpersys-payload
//!
//! The payload kinds attachable to a [`refpersys_core::object::Object`]:
//! symbol, class-info, mutable-set, deque, object-hashtable, string-dict
//! and space (spec §4.6), plus the process-wide payload-kind registry that
//! tracks each kind's remover/dump-scanner/dump-serializer callbacks
//! (spec §5 "Payload-registry lock").

#![forbid(unsafe_code)]

pub mod class_info;
pub mod deque;
pub mod mutable_set;
pub mod object_hashtable;
pub mod registry;
pub mod space;
pub mod string_dict;
pub mod symbol;

pub use class_info::ClassInfoPayload;
pub use deque::DequePayload;
pub use mutable_set::MutableSetPayload;
pub use object_hashtable::ObjectHashtablePayload;
pub use registry::{PayloadKindName, PayloadRegistry};
pub use space::SpacePayload;
pub use string_dict::StringDictPayload;
pub use symbol::SymbolPayload;
