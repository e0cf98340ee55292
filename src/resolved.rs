//! Resolved declaration and type model (spec.md §3): the output of
//! `module_set::resolver`, consumed by the constant evaluator, the
//! compatibility checker, the formatter's redaction pass, and the
//! definition/reference finder.
//!
//! Records refer to each other by `RecordKey`, not by owning pointer —
//! the "arena-like" ownership the design notes call for (§9): the
//! `ModuleSet` owns every node, cross-links are string keys resolved
//! through `ModuleSet::record_map`.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::doc_comment::Doc;
use crate::token::Token;

/// Uniquely identifies a record definition across the whole program:
/// `"<modulePath>:<declNamePositionOffset>"` (§3 "RecordKey invariant").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey(pub String);

impl RecordKey {
    pub fn new(module_path: &str, name_position_offset: usize) -> Self {
        RecordKey(format!("{module_path}:{name_position_offset}"))
    }

    pub fn module_path(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    Timestamp,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "bool" => Primitive::Bool,
            "int32" => Primitive::Int32,
            "int64" => Primitive::Int64,
            "uint32" => Primitive::Uint32,
            "uint64" => Primitive::Uint64,
            "float32" => Primitive::Float32,
            "float64" => Primitive::Float64,
            "string" => Primitive::String,
            "bytes" => Primitive::Bytes,
            "timestamp" => Primitive::Timestamp,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Uint32 => "uint32",
            Primitive::Uint64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
            Primitive::Timestamp => "timestamp",
        }
    }

    /// Numeric family, used by the compatibility checker's widening
    /// rule (§4.5: `int32 -> int64`, `uint32 -> uint64` is safe;
    /// crossing families is not).
    pub fn numeric_family(self) -> Option<NumericFamily> {
        match self {
            Primitive::Int32 | Primitive::Int64 => Some(NumericFamily::Signed),
            Primitive::Uint32 | Primitive::Uint64 => Some(NumericFamily::Unsigned),
            Primitive::Float32 | Primitive::Float64 => Some(NumericFamily::Float),
            _ => None,
        }
    }

    /// Bit width within a numeric family, for the widening check.
    pub fn width(self) -> u8 {
        match self {
            Primitive::Int32 | Primitive::Uint32 | Primitive::Float32 => 32,
            Primitive::Int64 | Primitive::Uint64 | Primitive::Float64 => 64,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericFamily {
    Signed,
    Unsigned,
    Float,
}

/// A resolved key-path step for a keyed array (§4.3 "Keyed arrays").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPathStep {
    pub field_name: String,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedArrayKey {
    pub path: Vec<KeyPathStep>,
    pub key_type: Box<ResolvedType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    Primitive(Primitive),
    Record(RecordKey),
    Array {
        item: Box<ResolvedType>,
        key: Option<KeyedArrayKey>,
    },
    Optional(Box<ResolvedType>),
    Null,
}

impl ResolvedType {
    pub fn unwrap_optional(&self) -> &ResolvedType {
        match self {
            ResolvedType::Optional(inner) => inner,
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ResolvedType::Optional(_))
    }

    pub fn record_key(&self) -> Option<&RecordKey> {
        match self.unwrap_optional() {
            ResolvedType::Record(k) => Some(k),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursivity {
    None,
    Soft,
    Hard,
}

/// A resolved struct field or enum variant.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Token,
    pub number: u32,
    pub ty: ResolvedType,
    /// `None` for a plain enum variant; always `Some` for struct fields.
    pub is_kind_carrying_or_struct_field: bool,
    pub is_recursive: Recursivity,
    pub doc: Option<Doc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Enum,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub key: RecordKey,
    pub kind: RecordKind,
    pub name: Token,
    pub number: Option<u32>,
    pub fields: Vec<Field>,
    /// Slot numbers reserved by `removed` placeholders (inclusive ranges
    /// flattened to individual numbers for easy membership checks).
    pub removed_numbers: Vec<u32>,
    pub nested: BTreeMap<String, RecordKey>,
    pub num_slots: u32,
    pub num_slots_incl_removed: u32,
    pub doc: Option<Doc>,
    /// True for the two records synthesized per `method` declaration
    /// (`FooRequest`/`FooResponse`) when its request/response type was
    /// an inline record (§4.3 "Declaration pass").
    pub is_synthesized: bool,
}

impl Record {
    pub fn field_by_number(&self, number: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.text == name)
    }

    /// `UNKNOWN = 0` is implicit unless the source defines slot 0
    /// itself (§4.3 "Field numbering").
    pub fn has_explicit_zero_variant(&self) -> bool {
        self.fields.iter().any(|f| f.number == 0)
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: Token,
    pub number: u32,
    pub request_type: ResolvedType,
    pub response_type: ResolvedType,
    pub doc: Option<Doc>,
}

#[derive(Debug, Clone)]
pub struct Constant {
    pub name: Token,
    pub ty: ResolvedType,
    pub value: Rc<crate::ast::Literal>,
    pub value_as_dense_json: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    ImportAlias { name: Token, module_path: String },
    Import { name: Token, module_path: String },
    Record(RecordKey),
    Method(Method),
    Constant(Constant),
}
