//! # refpersys-core
//!
//! Object identifiers, the zoned-value taxonomy, the immutable value
//! constructors and the mutable object core of the RefPerSys reflexive
//! object system.
//!
//! No `unsafe` code is permitted at the crate level.

#![forbid(unsafe_code)]

pub mod error;
pub mod log;
pub mod object;
pub mod oid;
pub mod primes;
pub mod value;

pub use error::{LoadError, RpsFault};
pub use object::{Object, ObjectRef, Runtime};
pub use oid::Oid;
pub use value::Value;
