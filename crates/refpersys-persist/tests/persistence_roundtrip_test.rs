use refpersys_core::log::{LogLevel, Logger};
use refpersys_core::object::{Payload, Runtime};
use refpersys_core::value::Value;
use refpersys_payload::{ClassInfoPayload, MutableSetPayload, PayloadRegistry};
use refpersys_persist::{dump_heap, load_heap};

fn silent_logger() -> Logger {
    Logger::new(Box::new(std::io::sink()), LogLevel::Error)
}

#[test]
fn empty_object_dumps_with_exactly_the_common_fields() {
    let rt = Runtime::new();
    let registry = PayloadRegistry::new();
    registry.register_builtin_kinds();
    let logger = silent_logger();

    let obj = rt.create_object();
    rt.add_global_root(&obj);

    let dir = tempfile::tempdir().unwrap();
    dump_heap(dir.path(), &rt, &registry, &logger).unwrap();

    let persistore = dir.path().join("persistore");
    let mut space_file = None;
    for entry in std::fs::read_dir(&persistore).unwrap() {
        space_file = Some(entry.unwrap().path());
    }
    let contents = std::fs::read_to_string(space_file.unwrap()).unwrap();
    let record_line = contents.lines().find(|l| l.starts_with('{') && l.contains("\"oid\"")).unwrap();
    let record: serde_json::Value = serde_json::from_str(record_line).unwrap();
    assert_eq!(record["oid"], obj.id().encode());
    assert_eq!(record["class"], rt.object_class().id().encode());
    assert_eq!(record["attrs"], serde_json::json!([]));
    assert_eq!(record["comps"], serde_json::json!([]));

    let rt2 = Runtime::new();
    load_heap(dir.path(), &rt2, &logger).unwrap();
    let reloaded = rt2.find(obj.id()).expect("object present after reload");
    assert_eq!(reloaded.class().id(), rt2.object_class().id());
}

#[test]
fn closure_with_captures_roundtrips_through_dump_and_load() {
    let rt = Runtime::new();
    let registry = PayloadRegistry::new();
    registry.register_builtin_kinds();
    let logger = silent_logger();

    let connective = rt.create_object();
    let holder = rt.create_object();
    let captured = Value::Closure(std::sync::Arc::new(refpersys_core::value::ClosureOb::new(
        connective.clone(),
        None,
        vec![Value::Int(42), Value::Str(std::sync::Arc::new(refpersys_core::value::RpsString::new("x")))],
    )));
    holder.push_component(captured);
    rt.add_global_root(&holder);
    rt.add_global_root(&connective);

    let dir = tempfile::tempdir().unwrap();
    dump_heap(dir.path(), &rt, &registry, &logger).unwrap();

    let rt2 = Runtime::new();
    load_heap(dir.path(), &rt2, &logger).unwrap();
    let reloaded_holder = rt2.find(holder.id()).unwrap();
    match reloaded_holder.get_component(0) {
        Value::Closure(c) => {
            assert_eq!(c.connective().id(), connective.id());
            assert_eq!(c.captured()[0].as_int(), Some(42));
            assert_eq!(c.captured()[1].as_str(), Some("x"));
        }
        other => panic!("expected closure component, got {other:?}"),
    }
}

#[test]
fn heap_with_attributes_components_and_a_payload_survives_a_full_roundtrip() {
    let rt = Runtime::new();
    let registry = PayloadRegistry::new();
    registry.register_builtin_kinds();
    let logger = silent_logger();

    let root = rt.create_object();
    let attr = rt.create_object();
    let member_a = rt.create_object();
    let member_b = rt.create_object();
    rt.put_attribute(&root, attr.clone(), Value::Int(7));
    root.push_component(Value::Int(1));
    root.push_component(Value::Object(member_a.clone()));

    let set = MutableSetPayload::new();
    set.add(member_a.clone());
    set.add(member_b.clone());
    root.put_payload(Box::new(set));

    rt.add_global_root(&root);
    rt.add_global_root(&attr);

    let dir = tempfile::tempdir().unwrap();
    let dump_stats = dump_heap(dir.path(), &rt, &registry, &logger).unwrap();
    assert!(dump_stats.nb_objects >= 4);

    let rt2 = Runtime::new();
    let load_stats = load_heap(dir.path(), &rt2, &logger).unwrap();
    assert_eq!(load_stats.nb_objects, dump_stats.nb_objects);

    let reloaded_root = rt2.find(root.id()).expect("root present after reload");
    assert_eq!(rt2.get_attribute(&reloaded_root, &rt2.ensure_object(attr.id())).as_int(), Some(7));
    assert_eq!(reloaded_root.nb_components(), 2);
    assert_eq!(reloaded_root.get_component(0).as_int(), Some(1));
    match reloaded_root.get_component(1) {
        Value::Object(o) => assert_eq!(o.id(), member_a.id()),
        other => panic!("expected object component, got {other:?}"),
    }

    let reloaded_set = reloaded_root
        .with_payload(|p| p.and_then(|pl| pl.as_any().downcast_ref::<MutableSetPayload>().map(MutableSetPayload::cardinal)));
    assert_eq!(reloaded_set, Some(2));
}

#[test]
fn class_info_method_dictionary_survives_a_dump_and_load_roundtrip() {
    let rt = Runtime::new();
    let registry = PayloadRegistry::new();
    registry.register_builtin_kinds();
    let logger = silent_logger();

    let class_obj = rt.create_object();
    let super_class = rt.create_object();
    let selector = rt.create_object();
    let method_obj = rt.create_object();

    let ci = ClassInfoPayload::new(Some(super_class.clone()), None);
    ci.put_method(selector.clone(), Value::Object(method_obj.clone()));
    class_obj.put_payload(Box::new(ci));

    rt.add_global_root(&class_obj);
    rt.add_global_root(&super_class);
    rt.add_global_root(&selector);
    rt.add_global_root(&method_obj);

    let dir = tempfile::tempdir().unwrap();
    dump_heap(dir.path(), &rt, &registry, &logger).unwrap();

    let rt2 = Runtime::new();
    load_heap(dir.path(), &rt2, &logger).unwrap();
    let reloaded_class = rt2.find(class_obj.id()).expect("class object present after reload");

    let reloaded_method = reloaded_class.with_payload(|p| {
        p.and_then(|pl| pl.as_any().downcast_ref::<ClassInfoPayload>())
            .and_then(|ci| ci.get_method(&rt2.ensure_object(selector.id())))
    });
    match reloaded_method {
        Some(Value::Object(o)) => assert_eq!(o.id(), method_obj.id()),
        other => panic!("expected object method after reload, got {other:?}"),
    }
}

#[test]
fn dump_is_atomic_and_leaves_no_temporary_files_behind() {
    let rt = Runtime::new();
    let registry = PayloadRegistry::new();
    registry.register_builtin_kinds();
    let logger = silent_logger();

    let obj = rt.create_object();
    rt.add_global_root(&obj);

    let dir = tempfile::tempdir().unwrap();
    dump_heap(dir.path(), &rt, &registry, &logger).unwrap();

    assert!(!dir.path().join("rps_manifest.json.tmp").exists());
    for entry in std::fs::read_dir(dir.path().join("persistore")).unwrap() {
        let path = entry.unwrap().path();
        assert!(!path.to_string_lossy().ends_with(".tmp"));
    }
}
