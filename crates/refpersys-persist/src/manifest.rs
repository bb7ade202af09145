//! The heap-directory manifest (spec §4.7 "On-disk layout"):
//! `rps_manifest.json` at the root of a heap directory, declaring the
//! format magic, object count, global roots, constants and the ordered
//! list of space oids.

use serde::{Deserialize, Serialize};

/// The manifest file's name, relative to a heap directory.
pub const MANIFEST_FILE_NAME: &str = "rps_manifest.json";

/// The single compile-time format magic (spec §6 "a mismatch is fatal at
/// load").
pub const FORMAT_MAGIC: &str = "refpersys/heap-format-1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format: String,
    pub nbobjects: usize,
    #[serde(default)]
    pub globalroots: Vec<String>,
    #[serde(default)]
    pub constants: Vec<String>,
    pub spaces: Vec<String>,
}

impl Manifest {
    pub fn new(nbobjects: usize, globalroots: Vec<String>, constants: Vec<String>, spaces: Vec<String>) -> Manifest {
        Manifest {
            format: FORMAT_MAGIC.to_string(),
            nbobjects,
            globalroots,
            constants,
            spaces,
        }
    }
}
