//! The four-state load protocol of spec §4.7: parse-manifest,
//! create-objects, fill-objects, epilogue.

use crate::manifest::{Manifest, FORMAT_MAGIC, MANIFEST_FILE_NAME};
use crate::payload_io;
use crate::value_codec::{decode, decode_oid_text};
use refpersys_core::error::LoadError;
use refpersys_core::log::{LogLevel, Logger};
use refpersys_core::object::Runtime;
use refpersys_core::oid::Oid;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct LoadStats {
    pub nb_objects: usize,
    pub nb_spaces: usize,
}

#[derive(serde::Deserialize)]
struct SpacePrologue {
    format: String,
    nbobjects: usize,
    #[serde(default)]
    #[allow(dead_code)]
    spaceid: Option<String>,
}

struct SpaceRecords {
    space_oid: Oid,
    records: Vec<(Oid, serde_json::Value)>,
}

/// Loads the heap directory at `dir` into `rt`, logging one event per
/// protocol state transition (spec §5 "Process-wide lifecycle").
pub fn load_heap(dir: &Path, rt: &Runtime, logger: &Logger) -> Result<LoadStats, LoadError> {
    let manifest = parse_manifest(dir)?;
    logger.log(LogLevel::Info, "persist", "parse-manifest complete");

    let mut spaces = Vec::with_capacity(manifest.spaces.len());
    for space_text in &manifest.spaces {
        let (space_oid, _) = Oid::decode(space_text)
            .map_err(|e| LoadError::MalformedValue(format!("bad space oid {space_text:?}: {e}")))?;
        let path = dir.join("persistore").join(format!("sp{}-rps.json", &space_text[1..]));
        let records = parse_space_file(&path)?;
        spaces.push(SpaceRecords { space_oid, records });
    }

    let known_oids: HashSet<Oid> = spaces.iter().flat_map(|s| s.records.iter().map(|(oid, _)| *oid)).collect();

    // create-objects: instantiate every object this load names before any
    // cross-reference is resolved, so forward references are never a
    // special case during fill-objects.
    for space in &spaces {
        for (oid, _) in &space.records {
            rt.ensure_object(*oid);
        }
    }
    for root_text in manifest.globalroots.iter().chain(manifest.constants.iter()) {
        let (oid, _) = Oid::decode(root_text)
            .map_err(|e| LoadError::MalformedValue(format!("bad root/constant oid {root_text:?}: {e}")))?;
        rt.ensure_object(oid);
    }
    logger.log(LogLevel::Info, "persist", "create-objects complete");

    let mut nb_objects = 0usize;
    for space in &spaces {
        let space_obj = rt.ensure_object(space.space_oid);
        for (oid, json) in &space.records {
            fill_object(*oid, json, Some(&space_obj), &known_oids, rt)?;
            nb_objects += 1;
        }
    }
    logger.log(LogLevel::Info, "persist", "fill-objects complete");

    for root_text in &manifest.globalroots {
        let obj = decode_oid_text(root_text, rt)?;
        rt.add_global_root(&obj);
    }
    logger.log(LogLevel::Info, "persist", "epilogue complete");

    Ok(LoadStats {
        nb_objects,
        nb_spaces: spaces.len(),
    })
}

fn parse_manifest(dir: &Path) -> Result<Manifest, LoadError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let text = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::MissingManifest(dir.to_path_buf())
        } else {
            LoadError::Io { path: path.clone(), source: e }
        }
    })?;
    let manifest: Manifest = serde_json::from_str(&text).map_err(|e| LoadError::MalformedJson { path: path.clone(), source: e })?;
    if manifest.format != FORMAT_MAGIC {
        return Err(LoadError::FormatMismatch {
            expected: FORMAT_MAGIC.to_string(),
            found: manifest.format.clone(),
        });
    }
    Ok(manifest)
}

fn fill_object(
    oid: Oid,
    json: &serde_json::Value,
    space_obj: Option<&refpersys_core::object::ObjectRef>,
    known_oids: &HashSet<Oid>,
    rt: &Runtime,
) -> Result<(), LoadError> {
    let obj = rt.find(oid).expect("create-objects already instantiated every record oid");
    let record = json
        .as_object()
        .ok_or_else(|| LoadError::MalformedValue(format!("object record for {oid} is not a JSON object")))?;

    let class_text = record
        .get("class")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LoadError::MalformedValue(format!("object record for {oid} missing \"class\"")))?;
    let (class_oid, _) =
        Oid::decode(class_text).map_err(|e| LoadError::MalformedValue(format!("bad class oid {class_text:?}: {e}")))?;
    if !(known_oids.contains(&class_oid) || class_oid == rt.object_class().id() || class_oid == rt.class_class().id()) {
        return Err(LoadError::MissingClass {
            oid: oid.encode(),
            class: class_text.to_string(),
        });
    }
    obj.set_class(rt.ensure_object(class_oid));

    if let Some(mtime) = record.get("mtime").and_then(|v| v.as_u64()) {
        obj.touch(mtime);
    }
    if let Some(space_obj) = space_obj {
        obj.set_space(Some(space_obj.clone()));
    }

    if let Some(attrs) = record.get("attrs").and_then(|v| v.as_array()) {
        for entry in attrs {
            let at = entry
                .get("at")
                .and_then(|v| v.as_str())
                .ok_or_else(|| LoadError::MalformedValue(format!("attribute entry on {oid} missing \"at\"")))?;
            let va = entry
                .get("va")
                .ok_or_else(|| LoadError::MalformedValue(format!("attribute entry on {oid} missing \"va\"")))?;
            let attr_obj = decode_oid_text(at, rt)?;
            let value = decode(va, rt)?;
            rt.put_attribute(&obj, attr_obj, value);
        }
    }

    if let Some(comps) = record.get("comps").and_then(|v| v.as_array()) {
        obj.reserve_components(comps.len());
        for comp in comps {
            obj.push_component(decode(comp, rt)?);
        }
    }

    if let Some(kind) = record.get("payload").and_then(|v| v.as_str()) {
        let payload = payload_io::load_payload(kind, record, &obj, rt)?;
        obj.put_payload(payload);
    }

    Ok(())
}

fn parse_space_file(path: &Path) -> Result<Vec<(Oid, serde_json::Value)>, LoadError> {
    let text = fs::read_to_string(path).map_err(|e| LoadError::Io { path: path.to_path_buf(), source: e })?;
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let mut prologue_line = None;
    for line in lines.by_ref() {
        if line.starts_with("//+ob_") || line.starts_with("//-ob_") {
            return Err(LoadError::MalformedValue(format!(
                "{path:?}: found an object delimiter before the prologue line"
            )));
        }
        if line.starts_with('/') {
            continue;
        }
        prologue_line = Some(line);
        break;
    }
    let prologue_line =
        prologue_line.ok_or_else(|| LoadError::MalformedValue(format!("{path:?} has no JSON prologue line")))?;
    let prologue: SpacePrologue =
        serde_json::from_str(prologue_line).map_err(|e| LoadError::MalformedJson { path: path.to_path_buf(), source: e })?;
    if prologue.format != FORMAT_MAGIC {
        return Err(LoadError::FormatMismatch {
            expected: FORMAT_MAGIC.to_string(),
            found: prologue.format,
        });
    }

    let mut records = Vec::with_capacity(prologue.nbobjects);
    let mut seen = HashSet::with_capacity(prologue.nbobjects);
    loop {
        let open = match lines.next() {
            Some(l) => l,
            None => break,
        };
        let open_text = open
            .strip_prefix("//+ob_")
            .ok_or_else(|| LoadError::MalformedValue(format!("{path:?}: expected object-open delimiter, got {open:?}")))?;
        let open_oid = parse_delimiter_oid(open_text)?;

        let record_line = lines
            .next()
            .ok_or_else(|| LoadError::MalformedValue(format!("{path:?}: truncated object record for {open_oid}")))?;
        let record: serde_json::Value = serde_json::from_str(record_line)
            .map_err(|e| LoadError::MalformedJson { path: path.to_path_buf(), source: e })?;

        let close = lines
            .next()
            .ok_or_else(|| LoadError::MalformedValue(format!("{path:?}: missing object-close delimiter for {open_oid}")))?;
        let close_text = close
            .strip_prefix("//-ob_")
            .ok_or_else(|| LoadError::MalformedValue(format!("{path:?}: expected object-close delimiter, got {close:?}")))?;
        let close_oid = parse_delimiter_oid(close_text)?;
        if close_oid != open_oid {
            return Err(LoadError::MalformedValue(format!(
                "{path:?}: mismatched object delimiters {open_oid} / {close_oid}"
            )));
        }

        if !seen.insert(open_oid) {
            return Err(LoadError::DuplicateOid(open_oid.encode()));
        }
        records.push((open_oid, record));
    }

    if records.len() != prologue.nbobjects {
        return Err(LoadError::RecordCountMismatch {
            declared: prologue.nbobjects,
            actual: records.len(),
        });
    }
    Ok(records)
}

fn parse_delimiter_oid(text_without_underscore: &str) -> Result<Oid, LoadError> {
    let full_text = format!("_{text_without_underscore}");
    Oid::decode(&full_text)
        .map(|(oid, _)| oid)
        .map_err(|e| LoadError::MalformedValue(format!("bad oid in delimiter {full_text:?}: {e}")))
}
