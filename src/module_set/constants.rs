//! Constant type-checking and dense-JSON encoding (§4.3 "Constants",
//! spec.md §8 scenario 4).
//!
//! Runs once a constant's declared type is fully resolved (called from
//! `type_resolve::resolve_const`). Produces both a `serde_json::Value`
//! ("dense" encoding, with trailing struct defaults dropped, consumed by
//! code generators) and `SkirError`s for every literal that does not
//! match its declared type.

use std::collections::HashMap;

use crate::ast::Literal;
use crate::error::{ErrorKind, SkirError};
use crate::resolved::{Field, Primitive, Record, RecordKey, RecordKind, ResolvedType};

/// Type-checks `value` against `ty`, appending any mismatch to `errors`,
/// and returns the dense-JSON encoding regardless (best-effort, so that
/// a single bad constant doesn't stop generators from seeing the rest
/// of the set — consistent with §7's "never abort on the first
/// diagnostic").
pub fn encode(
    value: &Literal,
    ty: &ResolvedType,
    record_map: &HashMap<RecordKey, Record>,
    errors: &mut Vec<SkirError>,
) -> serde_json::Value {
    match ty {
        ResolvedType::Optional(inner) => match value {
            Literal::Null(_) => serde_json::Value::Null,
            other => encode(other, inner, record_map, errors),
        },
        ResolvedType::Null => {
            if !matches!(value, Literal::Null(_)) {
                errors.push(mismatch(value, "null"));
            }
            serde_json::Value::Null
        }
        ResolvedType::Primitive(p) => encode_primitive(value, *p, errors),
        ResolvedType::Record(key) => encode_record(value, key, record_map, errors),
        ResolvedType::Array { item, key } => encode_array(value, item, key.as_ref(), record_map, errors),
    }
}

fn mismatch(value: &Literal, expected: &str) -> SkirError {
    SkirError::new(
        value.token().clone(),
        ErrorKind::TypeMismatch {
            expected: expected.to_string(),
        },
    )
}

fn encode_primitive(value: &Literal, p: Primitive, errors: &mut Vec<SkirError>) -> serde_json::Value {
    match (value, p) {
        (Literal::Bool(_, b), Primitive::Bool) => serde_json::Value::Bool(*b),
        (
            Literal::Int(tok),
            Primitive::Int32 | Primitive::Int64 | Primitive::Uint32 | Primitive::Uint64,
        ) => {
            let n: i64 = tok.text.parse().unwrap_or(0);
            if matches!(p, Primitive::Uint32 | Primitive::Uint64) && n < 0 {
                errors.push(mismatch(value, p.name()));
            }
            serde_json::Value::Number(n.into())
        }
        (Literal::Int(tok), Primitive::Float32 | Primitive::Float64) => {
            let n: f64 = tok.text.parse().unwrap_or(0.0);
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }
        (Literal::Float(tok), Primitive::Float32 | Primitive::Float64) => {
            let n: f64 = tok.text.parse().unwrap_or(0.0);
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }
        (Literal::Str(_, s), Primitive::String | Primitive::Bytes | Primitive::Timestamp) => {
            serde_json::Value::String(s.clone())
        }
        (Literal::Int(tok), Primitive::Timestamp) => {
            let n: i64 = tok.text.parse().unwrap_or(0);
            serde_json::Value::Number(n.into())
        }
        _ => {
            errors.push(mismatch(value, p.name()));
            default_primitive(p)
        }
    }
}

fn default_primitive(p: Primitive) -> serde_json::Value {
    match p {
        Primitive::Bool => serde_json::Value::Bool(false),
        Primitive::String | Primitive::Bytes | Primitive::Timestamp => {
            serde_json::Value::String(String::new())
        }
        _ => serde_json::Value::Number(0.into()),
    }
}

fn encode_record(
    value: &Literal,
    key: &RecordKey,
    record_map: &HashMap<RecordKey, Record>,
    errors: &mut Vec<SkirError>,
) -> serde_json::Value {
    let Some(record) = record_map.get(key) else {
        return serde_json::Value::Null;
    };
    match record.kind {
        RecordKind::Struct => match value {
            Literal::Object { token, partial, entries } => {
                encode_struct(*token, *partial, entries, record, record_map, errors)
            }
            _ => {
                errors.push(SkirError::new(value.token().clone(), ErrorKind::MustHaveStructType));
                serde_json::Value::Null
            }
        },
        RecordKind::Enum => encode_enum(value, record, record_map, errors),
    }
}

fn encode_struct(
    open_token: crate::token::Token,
    partial: bool,
    entries: &[(crate::token::Token, Literal)],
    record: &Record,
    record_map: &HashMap<RecordKey, Record>,
    errors: &mut Vec<SkirError>,
) -> serde_json::Value {
    let mut entry_map: HashMap<&str, &Literal> = HashMap::new();
    for (key_tok, lit) in entries {
        if record.field_by_name(&key_tok.text).is_some() {
            entry_map.insert(key_tok.text.as_str(), lit);
        } else {
            errors.push(SkirError::new(
                key_tok.clone(),
                ErrorKind::FieldNotFoundInStruct {
                    struct_name: record.name.text.clone(),
                    expected_names: record.fields.iter().map(|f| f.name.text.clone()).collect(),
                },
            ));
        }
    }

    if !partial {
        for field in &record.fields {
            if !entry_map.contains_key(field.name.text.as_str()) {
                errors.push(SkirError::new(
                    open_token.clone(),
                    ErrorKind::MissingEntry {
                        field: field.name.text.clone(),
                    },
                ));
            }
        }
    }

    let mut ordered: Vec<&Field> = record.fields.iter().collect();
    ordered.sort_by_key(|f| f.number);

    let mut values: Vec<serde_json::Value> = Vec::with_capacity(ordered.len());
    for field in ordered {
        let value = match entry_map.get(field.name.text.as_str()) {
            Some(lit) => encode(lit, &field.ty, record_map, errors),
            None => default_value(&field.ty),
        };
        values.push(value);
    }
    while values.last().is_some_and(|v| is_default(v, None)) {
        values.pop();
    }
    serde_json::Value::Array(values)
}

fn encode_enum(
    value: &Literal,
    record: &Record,
    record_map: &HashMap<RecordKey, Record>,
    errors: &mut Vec<SkirError>,
) -> serde_json::Value {
    match value {
        Literal::Str(_, name) | Literal::Ident(crate::token::Token { text: name, .. }) => {
            encode_plain_variant(value, name, record, errors)
        }
        Literal::Object { entries, .. } => {
            let kind = entries.iter().find(|(k, _)| k.text == "kind");
            let payload = entries.iter().find(|(k, _)| k.text == "value");
            let Some((_, kind_lit)) = kind else {
                errors.push(mismatch(value, "{kind, value}"));
                return serde_json::Value::Null;
            };
            let kind_name = match kind_lit {
                Literal::Str(_, s) => s.clone(),
                Literal::Ident(t) => t.text.clone(),
                _ => {
                    errors.push(mismatch(kind_lit, "string"));
                    return serde_json::Value::Null;
                }
            };
            let Some(field) = record.fields.iter().find(|f| f.name.text == kind_name) else {
                errors.push(SkirError::new(
                    kind_lit.token().clone(),
                    ErrorKind::VariantNotFoundInEnum {
                        enum_name: record.name.text.clone(),
                        expected_names: record.fields.iter().map(|f| f.name.text.clone()).collect(),
                    },
                ));
                return serde_json::Value::Null;
            };
            if matches!(field.ty, ResolvedType::Null) {
                errors.push(mismatch(value, "bare variant literal (this variant carries no value)"));
                return serde_json::Value::String(kind_name);
            }
            let encoded_value = match payload {
                Some((_, value_lit)) => encode(value_lit, &field.ty, record_map, errors),
                None => {
                    errors.push(SkirError::new(
                        value.token().clone(),
                        ErrorKind::MissingEntry {
                            field: "value".to_string(),
                        },
                    ));
                    serde_json::Value::Null
                }
            };
            serde_json::Value::Array(vec![serde_json::Value::Number(field.number.into()), encoded_value])
        }
        _ => {
            errors.push(mismatch(value, "enum value"));
            serde_json::Value::Null
        }
    }
}

fn encode_plain_variant(
    value: &Literal,
    name: &str,
    record: &Record,
    errors: &mut Vec<SkirError>,
) -> serde_json::Value {
    let Some(field) = record.fields.iter().find(|f| f.name.text == name) else {
        errors.push(SkirError::new(
            value.token().clone(),
            ErrorKind::VariantNotFoundInEnum {
                enum_name: record.name.text.clone(),
                expected_names: record.fields.iter().map(|f| f.name.text.clone()).collect(),
            },
        ));
        return serde_json::Value::Null;
    };
    if !matches!(field.ty, ResolvedType::Null) {
        errors.push(mismatch(value, "{kind, value} (this variant carries a value)"));
    }
    serde_json::Value::String(name.to_string())
}

fn encode_array(
    value: &Literal,
    item_ty: &ResolvedType,
    keyed: Option<&crate::resolved::KeyedArrayKey>,
    record_map: &HashMap<RecordKey, Record>,
    errors: &mut Vec<SkirError>,
) -> serde_json::Value {
    let Literal::Array(_, items) = value else {
        errors.push(mismatch(value, "array"));
        return serde_json::Value::Array(Vec::new());
    };

    let mut out = Vec::with_capacity(items.len());
    let mut seen_keys: Vec<(serde_json::Value, crate::token::Token)> = Vec::new();

    for item in items {
        let encoded = encode(item, item_ty, record_map, errors);
        if let Some(keyed) = keyed {
            if let Some(first_step) = keyed.path.first() {
                if let Literal::Object { entries, .. } = item {
                    match entries.iter().find(|(k, _)| k.text == first_step.field_name) {
                        Some((_, key_lit)) => {
                            let key_value = encode(key_lit, &keyed.key_type, record_map, errors);
                            if let Some((_, prior_token)) =
                                seen_keys.iter().find(|(v, _)| *v == key_value)
                            {
                                errors.push(SkirError::new(
                                    prior_token.clone(),
                                    ErrorKind::DuplicateKey,
                                ));
                                errors.push(SkirError::new(item.token().clone(), ErrorKind::DuplicateKey));
                            } else {
                                seen_keys.push((key_value, item.token().clone()));
                            }
                        }
                        None => {
                            errors.push(SkirError::new(
                                item.token().clone(),
                                ErrorKind::MissingEntry {
                                    field: first_step.field_name.clone(),
                                },
                            ));
                        }
                    }
                }
            }
        }
        out.push(encoded);
    }
    serde_json::Value::Array(out)
}

/// The dense-default for `ty`'s zero value (§4.3 "Constants" dense JSON
/// rules): numeric `0`, `false`, empty string, empty array, `null` for
/// optional. Record-typed fields have no such default.
fn default_value(ty: &ResolvedType) -> serde_json::Value {
    match ty {
        ResolvedType::Primitive(p) => default_primitive(*p),
        ResolvedType::Optional(_) | ResolvedType::Null => serde_json::Value::Null,
        ResolvedType::Array { .. } => serde_json::Value::Array(Vec::new()),
        ResolvedType::Record(_) => serde_json::Value::Null,
    }
}

fn is_default(value: &serde_json::Value, _ty: Option<&ResolvedType>) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;
    use crate::resolved::Declaration;
    use std::collections::HashMap as Map;

    fn compile_one(source: &str) -> crate::module_set::ModuleSet {
        let mut sources = Map::new();
        sources.insert("m.skir".to_string(), source.to_string());
        compile(&sources)
    }

    fn const_json<'a>(set: &'a crate::module_set::ModuleSet, name: &str) -> &'a serde_json::Value {
        let Declaration::Constant(c) = set.module("m.skir").unwrap().name_to_declaration.get(name).unwrap() else {
            panic!("not a constant");
        };
        &c.value_as_dense_json
    }

    #[test]
    fn struct_dense_json_drops_trailing_defaults() {
        let set = compile_one(
            "struct Point { x: int32; y: int32; }\nconst POINT: Point = {|x:10|};\n",
        );
        assert!(set.is_ok(), "{:?}", set.all_errors());
        assert_eq!(const_json(&set, "POINT"), &serde_json::json!([10]));
    }

    #[test]
    fn null_literal_for_optional_type() {
        let set = compile_one("struct Shape {}\nconst NULL_SHAPE: Shape? = null;\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
        assert_eq!(const_json(&set, "NULL_SHAPE"), &serde_json::Value::Null);
    }

    #[test]
    fn missing_entry_reported_for_full_object_literal() {
        let set = compile_one("struct Point { x: int32; y: int32; }\nconst P: Point = {x:1};\n");
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::MissingEntry { .. })));
    }

    #[test]
    fn plain_enum_variant_encodes_as_name_string() {
        let set = compile_one("enum Color { RED; GREEN; }\nconst C: Color = \"RED\";\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
        assert_eq!(const_json(&set, "C"), &serde_json::json!("RED"));
    }

    #[test]
    fn int_literal_rejected_for_string_type() {
        let set = compile_one("const X: string = 5;\n");
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::TypeMismatch { .. })));
    }
}
