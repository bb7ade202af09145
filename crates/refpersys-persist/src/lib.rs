//! # refpersys-persist
//!
//! Two-pass JSON heap persistence (spec §4.7): the manifest format, the
//! four-state loader, the three-state dumper, and the `Runtime`-dependent
//! half of value JSON decoding (the pure encode half lives in
//! `refpersys_core::value::codec`).

#![forbid(unsafe_code)]

pub mod dumper;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod payload_io;
pub mod value_codec;

pub use dumper::{dump_heap, DumpStats};
pub use error::DumpError;
pub use loader::{load_heap, LoadStats};
pub use manifest::Manifest;
pub use value_codec::decode;
