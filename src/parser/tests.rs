use super::*;

fn parse_ok(source: &str) -> ParsedModule {
    let (module, _tokens) = parse_module("m.skir", source, Mode::Strict);
    assert!(module.errors.is_empty(), "unexpected errors: {:?}", module.errors);
    module
}

#[test]
fn parses_struct_with_number_and_fields() {
    let module = parse_ok("struct Foo(100) {\n  x: int32 = 0;\n  y: string;\n}\n");
    assert_eq!(module.declarations.len(), 1);
    let Decl::Record(r) = &module.declarations[0] else {
        panic!("expected record")
    };
    assert_eq!(r.kind, RecordKind::Struct);
    assert_eq!(r.name.text, "Foo");
    assert_eq!(r.number.as_ref().unwrap().text, "100");
    assert_eq!(r.members.len(), 2);
}

#[test]
fn parses_enum_with_plain_and_kind_carrying_variants() {
    let module = parse_ok("enum Shape {\n  circle: Circle;\n  UNKNOWN = 0;\n}\n");
    let Decl::Record(r) = &module.declarations[0] else {
        panic!()
    };
    assert_eq!(r.kind, RecordKind::Enum);
    let Member::Field(f0) = &r.members[0] else {
        panic!()
    };
    assert!(f0.type_expr.is_some());
    let Member::Field(f1) = &r.members[1] else {
        panic!()
    };
    assert!(f1.type_expr.is_none());
    assert_eq!(f1.number.as_ref().unwrap().text, "0");
}

#[test]
fn parses_import_alias_and_named_imports() {
    let module = parse_ok(
        "import * as Common from \"common.skir\";\nimport Foo, Bar from \"types.skir\";\n",
    );
    assert_eq!(module.declarations.len(), 3);
    assert!(matches!(module.declarations[0], Decl::ImportAlias(_)));
    assert!(matches!(module.declarations[1], Decl::Import(_)));
    assert!(matches!(module.declarations[2], Decl::Import(_)));
}

#[test]
fn parses_method_declaration() {
    let module = parse_ok("method GetUser(GetUserRequest): GetUserResponse = 12345;\n");
    let Decl::Method(m) = &module.declarations[0] else {
        panic!()
    };
    assert_eq!(m.name.text, "GetUser");
    assert_eq!(m.number.text, "12345");
}

#[test]
fn parses_keyed_array_type() {
    let module = parse_ok("struct Foo { users: [User|key]; }\n");
    let Decl::Record(r) = &module.declarations[0] else {
        panic!()
    };
    let Member::Field(f) = &r.members[0] else { panic!() };
    match f.type_expr.as_ref().unwrap() {
        TypeExpr::Array { key, .. } => {
            assert_eq!(key.as_ref().unwrap()[0].text, "key");
        }
        _ => panic!("expected array type"),
    }
}

#[test]
fn parses_optional_type() {
    let module = parse_ok("const X: Shape? = null;\n");
    let Decl::Const(c) = &module.declarations[0] else {
        panic!()
    };
    assert!(matches!(c.type_expr, TypeExpr::Optional(_)));
    assert!(matches!(c.value, Literal::Null(_)));
}

#[test]
fn parses_removed_ranges_and_lists() {
    let module = parse_ok("struct Foo {\n  removed 1;\n  removed 2..4;\n  removed 5, 6;\n}\n");
    let Decl::Record(r) = &module.declarations[0] else {
        panic!()
    };
    assert_eq!(r.members.len(), 3);
    let Member::Removed(r0) = &r.members[0] else { panic!() };
    assert_eq!(r0.ranges, vec![(1, 1)]);
    let Member::Removed(r1) = &r.members[1] else { panic!() };
    assert_eq!(r1.ranges, vec![(2, 4)]);
    let Member::Removed(r2) = &r.members[2] else { panic!() };
    assert_eq!(r2.ranges, vec![(5, 5), (6, 6)]);
}

#[test]
fn parses_nested_record() {
    let module = parse_ok("struct Outer {\n  struct Inner { x: int32; }\n  y: Inner;\n}\n");
    let Decl::Record(r) = &module.declarations[0] else {
        panic!()
    };
    assert_eq!(r.members.len(), 2);
    assert!(matches!(r.members[0], Member::Nested(_)));
}

#[test]
fn parses_inline_struct_field_type() {
    let module = parse_ok("struct Outer {\n  inner: struct { x: int32; };\n}\n");
    let Decl::Record(r) = &module.declarations[0] else {
        panic!()
    };
    let Member::Field(f) = &r.members[0] else { panic!() };
    assert!(matches!(f.type_expr, Some(TypeExpr::InlineRecord(_))));
}

#[test]
fn parses_partial_object_literal() {
    let module = parse_ok("const P: Point = {|x: 10|};\n");
    let Decl::Const(c) = &module.declarations[0] else {
        panic!()
    };
    let Literal::Object { partial, entries, .. } = &c.value else {
        panic!()
    };
    assert!(partial);
    assert_eq!(entries.len(), 1);
}

#[test]
fn parses_empty_partial_object_literal() {
    let module = parse_ok("const P: Point = {||};\n");
    let Decl::Const(c) = &module.declarations[0] else {
        panic!()
    };
    let Literal::Object { partial, entries, .. } = &c.value else {
        panic!()
    };
    assert!(partial);
    assert!(entries.is_empty());
}

#[test]
fn duplicate_object_keys_are_reported() {
    let (module, _) = parse_module("m.skir", "const P: Point = {x: 1, x: 2};\n", Mode::Strict);
    assert_eq!(module.errors.len(), 1);
    assert!(matches!(module.errors[0].kind, ErrorKind::DuplicateKey));
}

#[test]
fn lenient_mode_tolerates_missing_semicolons() {
    let (module, _tokens) =
        parse_module("m.skir", "struct Foo { x: int32 }", Mode::Lenient);
    assert!(module.errors.is_empty());
    assert_eq!(module.declarations.len(), 1);
}

#[test]
fn strict_mode_reports_unexpected_token() {
    let (module, _tokens) = parse_module("m.skir", "struct 123 {}", Mode::Strict);
    assert!(!module.errors.is_empty());
}
