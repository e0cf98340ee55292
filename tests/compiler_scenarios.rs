//! End-to-end scenarios driven through the public glue API
//! (`InMemoryFileReader` + `ModuleCollector`) rather than calling
//! `module_set::compile` directly, so these exercise the same path a
//! real caller would use. Each unit test embedded next to its pass
//! covers the mechanics in isolation; these cover the six concrete
//! scenarios end to end.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use skir::compat;
use skir::error::ErrorKind;
use skir::glue::{InMemoryFileReader, ModuleCollector};
use skir::module_set::compile;
use skir::resolved::{Declaration, Primitive, ResolvedType};

fn collect(modules: &[(&str, &str)]) -> HashMap<String, String> {
    let map = modules
        .iter()
        .map(|(path, src)| (path.to_string(), src.to_string()))
        .collect();
    ModuleCollector::collect(&InMemoryFileReader::new(map)).unwrap()
}

#[test]
fn keyed_array_resolution() {
    let sources = collect(&[(
        "m.skir",
        "enum KeyEnum { A; B; }\n\
         struct Outer {\n  struct User { key: string; key_enum: KeyEnum; }\n}\n\
         struct Foo {\n  users: [Outer.User|key];\n  users_by_enum: [Outer.User|key_enum.kind];\n}\n",
    )]);
    let set = compile(&sources);
    assert!(set.is_ok(), "{:?}", set.all_errors());

    let Declaration::Record(foo_key) = set.module("m.skir").unwrap().name_to_declaration.get("Foo").unwrap() else {
        panic!("Foo is not a record");
    };
    let foo = set.record(foo_key).unwrap();

    let ResolvedType::Array { key: Some(by_string), .. } = &foo.field_by_name("users").unwrap().ty else {
        panic!("users should be a keyed array");
    };
    assert_eq!(*by_string.key_type, ResolvedType::Primitive(Primitive::String));

    let ResolvedType::Array { key: Some(by_enum), .. } = &foo.field_by_name("users_by_enum").unwrap().ty else {
        panic!("users_by_enum should be a keyed array");
    };
    assert!(matches!(*by_enum.key_type, ResolvedType::Record(_)));
}

#[test]
fn stable_id_uniqueness_across_packages() {
    let packaged = collect(&[
        ("@org/a/m1.skir", "struct Foo(100) {}\n"),
        ("@org/b/m2.skir", "struct Bar(100) {}\n"),
    ]);
    let set = compile(&packaged);
    assert!(set.is_ok(), "{:?}", set.all_errors());

    let unpackaged = collect(&[("a/m1.skir", "struct Foo(100) {}\n"), ("b/m2.skir", "struct Bar(100) {}\n")]);
    let set = compile(&unpackaged);
    let errors = set.all_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, ErrorKind::SameNumberAs { .. }));
}

#[test]
fn doc_reference_resolution() {
    let sources = collect(&[(
        "m.skir",
        "/// Hello [Bar.OK]\nstruct Foo { x: int32; }\nenum Bar { OK; }\n",
    )]);
    let set = compile(&sources);
    assert!(set.is_ok(), "{:?}", set.all_errors());

    let module = set.module("m.skir").unwrap();
    let Declaration::Record(foo_key) = module.name_to_declaration.get("Foo").unwrap() else {
        panic!("Foo is not a record");
    };
    let doc = set.record(foo_key).unwrap().doc.as_ref().expect("Foo should have a doc");
    assert_eq!(doc.pieces.len(), 2);
}

#[test]
fn constant_dense_json() {
    let sources = collect(&[(
        "m.skir",
        "struct Point { x: int32; y: int32; }\nconst POINT: Point = {|x:10|};\n\
         struct Shape {}\nconst NULL_SHAPE: Shape? = null;\n",
    )]);
    let set = compile(&sources);
    assert!(set.is_ok(), "{:?}", set.all_errors());

    let module = set.module("m.skir").unwrap();
    let Declaration::Constant(point) = module.name_to_declaration.get("POINT").unwrap() else {
        panic!("POINT is not a constant");
    };
    assert_eq!(point.value_as_dense_json, serde_json::json!([10]));

    let Declaration::Constant(null_shape) = module.name_to_declaration.get("NULL_SHAPE").unwrap() else {
        panic!("NULL_SHAPE is not a constant");
    };
    assert_eq!(null_shape.value_as_dense_json, serde_json::Value::Null);
}

#[test]
fn casing_rejection() {
    // All-uppercase struct names are rejected under UpperCamel (§4.3
    // "Casing": indistinguishable from an UPPER_UNDERSCORE constant).
    let set = compile(&collect(&[("m.skir", "struct XML {}\n")]));
    let bad_casing: Vec<_> = set.all_errors().into_iter().filter(|e| matches!(e.kind, ErrorKind::BadCasing { .. })).collect();
    assert_eq!(bad_casing.len(), 1);

    // A struct field must be `lower_underscore`.
    let set = compile(&collect(&[("m.skir", "struct S { fOO: int32; }\n")]));
    let bad_casing: Vec<_> = set.all_errors().into_iter().filter(|e| matches!(e.kind, ErrorKind::BadCasing { .. })).collect();
    assert_eq!(bad_casing.len(), 1);
}

#[test]
fn compatibility_safe_vs_unsafe_evolution() {
    let widened = compile(&collect(&[("m.skir", "struct S(1) { a: int64; }\n")]));
    let before = compile(&collect(&[("m.skir", "struct S(1) { a: int32; }\n")]));
    let changes = compat::check(
        &before.record_map,
        &widened.record_map,
        &compat::methods_of(&before),
        &compat::methods_of(&widened),
    );
    assert!(changes.is_empty(), "widening int32 -> int64 should not be breaking: {changes:?}");

    let family_changed = compile(&collect(&[("m.skir", "struct S(1) { a: uint32; }\n")]));
    let changes = compat::check(
        &before.record_map,
        &family_changed.record_map,
        &compat::methods_of(&before),
        &compat::methods_of(&family_changed),
    );
    assert_eq!(changes.len(), 1, "crossing numeric families should be breaking");

    let removed_without_marker = compile(&collect(&[("m.skir", "struct S(1) {}\n")]));
    let changes = compat::check(
        &before.record_map,
        &removed_without_marker.record_map,
        &compat::methods_of(&before),
        &compat::methods_of(&removed_without_marker),
    );
    assert_eq!(changes.len(), 1, "removing a field without `removed` should be breaking");
}
