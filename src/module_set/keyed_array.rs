//! Keyed-array path validation (§4.3 "Keyed arrays"): `[Item|a.b.c]`
//! requires `Item` (or `Item?`) to resolve to a record, and `a.b.c` to
//! be a dotted path of field names ending on a primitive-typed field —
//! the value used to key array entries when diffing/merging.

use std::collections::HashMap;

use crate::error::{ErrorKind, SkirError};
use crate::resolved::{KeyPathStep, KeyedArrayKey, Record, RecordKey, RecordKind, ResolvedType};
use crate::token::Token;

pub fn resolve(
    path: &[Token],
    item: &ResolvedType,
    record_map: &HashMap<RecordKey, Record>,
    errors: &mut Vec<SkirError>,
) -> Option<KeyedArrayKey> {
    let Some(first) = path.first() else {
        return None;
    };
    let Some(mut current_key) = item.record_key().cloned() else {
        errors.push(SkirError::new(first.clone(), ErrorKind::NotARecord));
        return None;
    };

    let mut steps = Vec::with_capacity(path.len());
    let mut key_type: Option<ResolvedType> = None;

    for (i, step_token) in path.iter().enumerate() {
        let Some(record) = record_map.get(&current_key) else {
            return None;
        };
        let is_last = i == path.len() - 1;

        // §4.3 "Keyed arrays": the last step, if it lands on an enum, must
        // be the synthetic `kind` discriminant rather than a real field —
        // the enum's variant tag is itself the key's value domain.
        if is_last && record.kind == RecordKind::Enum && step_token.text == "kind" {
            steps.push(KeyPathStep {
                field_name: step_token.text.clone(),
                token: step_token.clone(),
            });
            key_type = Some(ResolvedType::Record(current_key.clone()));
            break;
        }

        if record.kind != RecordKind::Struct {
            errors.push(SkirError::new(step_token.clone(), ErrorKind::MustHaveStructType));
            return None;
        }

        let Some(field) = record.field_by_name(&step_token.text) else {
            errors.push(SkirError::new(
                step_token.clone(),
                ErrorKind::FieldNotFoundInStruct {
                    struct_name: record.name.text.clone(),
                    expected_names: record.fields.iter().map(|f| f.name.text.clone()).collect(),
                },
            ));
            return None;
        };
        if field.ty.is_optional() {
            errors.push(SkirError::new(step_token.clone(), ErrorKind::MustHaveStructType));
            return None;
        }
        steps.push(KeyPathStep {
            field_name: step_token.text.clone(),
            token: step_token.clone(),
        });

        if is_last {
            if !is_key_eligible(field.ty.unwrap_optional()) {
                errors.push(SkirError::new(
                    step_token.clone(),
                    ErrorKind::DoesNotHavePrimitiveType,
                ));
                return None;
            }
            key_type = Some(field.ty.unwrap_optional().clone());
        } else {
            match field.ty.unwrap_optional().record_key() {
                Some(next_key) => current_key = next_key.clone(),
                None => {
                    errors.push(SkirError::new(step_token.clone(), ErrorKind::NotARecord));
                    return None;
                }
            }
        }
    }

    key_type.map(|key_type| KeyedArrayKey {
        path: steps,
        key_type: Box::new(key_type),
    })
}

fn is_key_eligible(ty: &ResolvedType) -> bool {
    matches!(ty, ResolvedType::Primitive(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;
    use crate::resolved::Declaration;

    #[test]
    fn validates_keyed_array_over_record_field() {
        let mut sources = HashMap::new();
        sources.insert(
            "m.skir".to_string(),
            "struct User { id: string; }\nstruct Group { users: [User|id]; }\n".to_string(),
        );
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("Group").unwrap()
        else {
            panic!()
        };
        let record = set.record(key).unwrap();
        let ResolvedType::Array { key: Some(keyed), .. } = &record.fields[0].ty else {
            panic!("expected keyed array");
        };
        assert_eq!(keyed.path.len(), 1);
        assert_eq!(keyed.path[0].field_name, "id");
    }

    #[test]
    fn keyed_array_via_enum_kind_discriminant_resolves_to_record_reference() {
        // spec.md §8 scenario 1.
        let mut sources = HashMap::new();
        sources.insert(
            "m.skir".to_string(),
            "enum KeyEnum { A; B; }\n\
             struct Outer {\n\
             \u{20}\u{20}struct User { key: string; key_enum: KeyEnum; }\n\
             }\n\
             struct Foo {\n\
             \u{20}\u{20}users: [Outer.User|key];\n\
             \u{20}\u{20}users_by_enum: [Outer.User|key_enum.kind];\n\
             }\n"
                .to_string(),
        );
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("Foo").unwrap() else {
            panic!()
        };
        let record = set.record(key).unwrap();
        let ResolvedType::Array { key: Some(keyed_by_string), .. } = &record.field_by_name("users").unwrap().ty
        else {
            panic!("expected keyed array");
        };
        assert!(matches!(*keyed_by_string.key_type, ResolvedType::Primitive(crate::resolved::Primitive::String)));

        let ResolvedType::Array { key: Some(keyed_by_enum), .. } =
            &record.field_by_name("users_by_enum").unwrap().ty
        else {
            panic!("expected keyed array");
        };
        assert_eq!(keyed_by_enum.path.len(), 2);
        assert_eq!(keyed_by_enum.path[1].field_name, "kind");
        assert!(matches!(*keyed_by_enum.key_type, ResolvedType::Record(_)));
    }

    #[test]
    fn rejects_key_path_into_non_primitive_field() {
        let mut sources = HashMap::new();
        sources.insert(
            "m.skir".to_string(),
            "struct Inner { x: int32; }\nstruct User { inner: Inner; }\nstruct Group { users: [User|inner]; }\n"
                .to_string(),
        );
        let set = compile(&sources);
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::DoesNotHavePrimitiveType)));
    }
}
