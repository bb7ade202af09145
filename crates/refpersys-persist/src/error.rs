//! Dump-side errors. Load-side corruption is modeled by
//! `refpersys_core::error::LoadError`; dumping only ever fails on I/O or
//! JSON serialization, which this crate owns since nothing in
//! `refpersys-core` writes files.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("io error writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize a heap record to JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
