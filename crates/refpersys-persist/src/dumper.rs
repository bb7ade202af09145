//! The dump protocol of spec §4.7: scanning, dumping-data, emitting-code.
//! Emitting-code (the C-code generator) is out of scope (spec §1) and is a
//! deliberate no-op here.

use crate::error::DumpError;
use crate::manifest::Manifest;
use refpersys_core::log::{LogLevel, Logger};
use refpersys_core::object::{ObjectRef, Runtime};
use refpersys_core::oid::Oid;
use refpersys_core::value::{codec, Value};
use refpersys_payload::PayloadRegistry;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct DumpStats {
    pub nb_objects: usize,
    pub nb_spaces: usize,
}

/// Dumps every object reachable from the global roots into `dir` (spec
/// §6 "Persistent state": atomic per-file writes, manifest written last).
pub fn dump_heap(dir: &Path, rt: &Runtime, payload_registry: &PayloadRegistry, logger: &Logger) -> Result<DumpStats, DumpError> {
    let reachable = scan_reachable(rt, payload_registry);
    logger.log(LogLevel::Info, "persist", "scanning complete");

    let persistore = dir.join("persistore");
    fs::create_dir_all(&persistore).map_err(|e| DumpError::Io { path: persistore.clone(), source: e })?;

    let mut by_space: BTreeMap<Oid, Vec<ObjectRef>> = BTreeMap::new();
    for obj in &reachable {
        let space_oid = obj.space().map(|s| s.id()).unwrap_or(Oid::NULL);
        by_space.entry(space_oid).or_default().push(obj.clone());
    }
    for objs in by_space.values_mut() {
        objs.sort_by_key(|o| o.id());
    }

    for (space_oid, objs) in &by_space {
        write_space_file(&persistore, *space_oid, objs, rt, payload_registry)?;
    }
    logger.log(LogLevel::Info, "persist", "dumping-data complete");

    let manifest = Manifest::new(
        reachable.len(),
        rt.global_roots().into_iter().map(Oid::encode).collect(),
        Vec::new(),
        by_space.keys().map(|oid| oid.encode()).collect(),
    );
    let manifest_path = dir.join(crate::manifest::MANIFEST_FILE_NAME);
    atomic_write(&manifest_path, serde_json::to_string_pretty(&manifest)?.as_bytes())?;
    logger.log(LogLevel::Info, "persist", "emitting-code complete (no-op: C-code generation is out of scope)");

    Ok(DumpStats {
        nb_objects: reachable.len(),
        nb_spaces: by_space.len(),
    })
}

/// Depth-first walk from the global roots over class, space, attribute
/// keys/values, components and each payload kind's own scanner (spec
/// §4.7 "Scanning").
fn scan_reachable(rt: &Runtime, payload_registry: &PayloadRegistry) -> Vec<ObjectRef> {
    let mut visited: HashSet<Oid> = HashSet::new();
    let mut stack: Vec<ObjectRef> = rt.global_roots().into_iter().filter_map(|oid| rt.find(oid)).collect();
    let mut order: Vec<ObjectRef> = Vec::new();

    while let Some(obj) = stack.pop() {
        if !visited.insert(obj.id()) {
            continue;
        }
        order.push(obj.clone());

        stack.push(obj.class());
        if let Some(space) = obj.space() {
            stack.push(space);
        }
        for (attr, value) in obj.attributes() {
            stack.push(attr);
            push_value_refs(&value, &mut stack);
        }
        for comp in obj.components() {
            push_value_refs(&comp, &mut stack);
        }
        if let Some(tag) = obj.payload_tag() {
            if let Some(scanner) = payload_registry.scanner_for(tag) {
                obj.with_payload(|payload| {
                    if let Some(payload) = payload {
                        scanner(payload, &mut |referenced: &ObjectRef| stack.push(referenced.clone()));
                    }
                });
            }
        }
    }
    order
}

fn push_value_refs(value: &Value, stack: &mut Vec<ObjectRef>) {
    match value {
        Value::Object(o) => stack.push(o.clone()),
        Value::Tuple(t) => {
            for ix in 0..t.arity() as i64 {
                if let Some(o) = t.nth(ix) {
                    stack.push(o.clone());
                }
            }
        }
        Value::Set(s) => stack.extend(s.members().iter().cloned()),
        Value::Closure(c) => {
            stack.push(c.connective().clone());
            if let Some(meta) = c.metadata() {
                push_value_refs(meta, stack);
            }
            for captured in c.captured() {
                push_value_refs(captured, stack);
            }
        }
        _ => {}
    }
}

fn write_space_file(
    persistore: &Path,
    space_oid: Oid,
    objs: &[ObjectRef],
    rt: &Runtime,
    payload_registry: &PayloadRegistry,
) -> Result<(), DumpError> {
    let path = persistore.join(format!("sp{}-rps.json", &space_oid.encode()[1..]));
    let mut out = String::new();
    out.push_str("// generated heap space file, do not hand-edit\n");
    let prologue = serde_json::json!({
        "format": crate::manifest::FORMAT_MAGIC,
        "nbobjects": objs.len(),
        "spaceid": space_oid.encode(),
    });
    out.push_str(&serde_json::to_string(&prologue)?);
    out.push('\n');

    for obj in objs {
        let bare = obj.id().encode()[1..].to_string();
        out.push_str(&format!("//+ob_{bare}\n"));
        let record = serialize_object(obj, rt, payload_registry);
        out.push_str(&serde_json::to_string(&record)?);
        out.push('\n');
        out.push_str(&format!("//-ob_{bare}\n"));
    }

    atomic_write(&path, out.as_bytes())
}

fn serialize_object(obj: &ObjectRef, _rt: &Runtime, payload_registry: &PayloadRegistry) -> serde_json::Value {
    let attrs: Vec<serde_json::Value> = obj
        .attributes()
        .iter()
        .map(|(attr, value)| serde_json::json!({ "at": attr.id().encode(), "va": codec::encode(value) }))
        .collect();
    let comps: Vec<serde_json::Value> = obj.components().iter().map(codec::encode).collect();

    let mut record = serde_json::json!({
        "oid": obj.id().encode(),
        "class": obj.class().id().encode(),
        "mtime": obj.mtime(),
        "attrs": attrs,
        "comps": comps,
    });

    if let Some(tag) = obj.payload_tag() {
        if let Some(serializer) = payload_registry.serializer_for(tag) {
            let payload_json = obj.with_payload(|p| p.map(serializer));
            if let Some(serde_json::Value::Object(fields)) = payload_json {
                if let serde_json::Value::Object(map) = &mut record {
                    map.extend(fields);
                }
            }
        }
    }
    record
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), DumpError> {
    let tmp_path: PathBuf = path.with_file_name(format!(
        "{}.tmp",
        path.file_name().expect("path always has a file name").to_string_lossy()
    ));
    fs::write(&tmp_path, bytes).map_err(|e| DumpError::Io { path: tmp_path.clone(), source: e })?;
    fs::rename(&tmp_path, path).map_err(|e| DumpError::Io { path: path.to_path_buf(), source: e })?;
    Ok(())
}
