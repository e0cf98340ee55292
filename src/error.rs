//! `SkirError`: the collected-diagnostic type every pipeline stage
//! appends to instead of failing the whole compile (§7).
//!
//! Grounded in the teacher's `issues::Issue` + `Severity`/`Rule` split
//! (`src/issues.rs`, `src/issue.rs`): a closed, serializable enum of
//! "kinds", one struct of shared positional data, and a `Display` impl
//! doing the human-facing rendering. Skir has no severities beyond
//! "error" (the language has no lint-level warnings in its core), so
//! there is no `Severity` analogue here.

use std::fmt;

use serde::Serialize;

use crate::token::Token;

/// The closed taxonomy from spec.md §7, grouped by category in a
/// comment but flattened into one enum so callers can match
/// exhaustively without a second discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ErrorKind {
    // --- Lexical ---
    UnterminatedString,
    UnterminatedBlockComment,
    InvalidCharacter { found: String },

    // --- Syntactic ---
    UnexpectedToken { expected: String },

    // --- Import graph ---
    ModuleNotFound { path: String },
    CircularDependency,
    ModulePathEscapesRoot,
    ReplaceBackslashWithSlash,
    ModuleAlreadyImportedWithAlias,
    ModuleAlreadyImportedWithDifferentAlias,

    // --- Resolution ---
    CannotFindName {
        name: String,
        expected_names: Vec<String>,
    },
    CannotResolveReference,
    NotARecord,
    NotFound,
    CannotReferToImportsOfImportedModule,
    CannotReimportImportedRecord,
    UnusedImport,
    UnusedImportAlias,

    // --- Semantic / typing ---
    FieldNotFoundInStruct {
        struct_name: String,
        expected_names: Vec<String>,
    },
    MustHaveStructType,
    DoesNotHavePrimitiveType,
    MissingEntry { field: String },
    VariantNotFoundInEnum {
        enum_name: String,
        expected_names: Vec<String>,
    },
    DuplicateKey,
    TypeMismatch { expected: String },

    // --- Uniqueness ---
    SameNumberAs { other_name: String, other_path: String },
    DuplicateFieldName { name: String },
    DuplicateDeclarationName { name: String },

    // --- Casing ---
    BadCasing { expected: String },

    // --- Compatibility (see compat::BreakingChange for the full payload) ---
    Breaking { description: String },
}

/// One collected diagnostic: a `Token` locating it plus the taxonomy
/// entry and the cross-module suppression flag from §7.
#[derive(Debug, Clone, Serialize)]
pub struct SkirError {
    #[serde(skip)]
    pub token: Token,
    pub kind: ErrorKind,
    pub message: Option<String>,
    /// True when the root cause lives in a module other than the one
    /// `token` points into (propagated across an import edge), so a UI
    /// can suppress cascades (§7 propagation policy).
    pub error_is_in_other_module: bool,
}

impl SkirError {
    pub fn new(token: Token, kind: ErrorKind) -> Self {
        SkirError {
            token,
            kind,
            message: None,
            error_is_in_other_module: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn in_other_module(mut self) -> Self {
        self.error_is_in_other_module = true;
        self
    }

    /// `expectedNames` for IDE suggestion, when the kind carries one.
    pub fn expected_names(&self) -> Option<&[String]> {
        match &self.kind {
            ErrorKind::CannotFindName { expected_names, .. }
            | ErrorKind::FieldNotFoundInStruct { expected_names, .. }
            | ErrorKind::VariantNotFoundInEnum { expected_names, .. } => Some(expected_names),
            _ => None,
        }
    }

    /// `expected` description, when the kind carries one (parse-like
    /// errors and casing errors).
    pub fn expected(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::UnexpectedToken { expected } => Some(expected),
            ErrorKind::BadCasing { expected } => Some(expected),
            ErrorKind::TypeMismatch { expected } => Some(expected),
            _ => None,
        }
    }
}

impl fmt::Display for SkirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.token)?;
        if let Some(message) = &self.message {
            return write!(f, "{message}");
        }
        match &self.kind {
            ErrorKind::UnterminatedString => write!(f, "Unterminated string literal"),
            ErrorKind::UnterminatedBlockComment => write!(f, "Unterminated block comment"),
            ErrorKind::InvalidCharacter { found } => write!(f, "Invalid character '{found}'"),
            ErrorKind::UnexpectedToken { expected } => write!(f, "Expected {expected}"),
            ErrorKind::ModuleNotFound { path } => write!(f, "Module not found: {path}"),
            ErrorKind::CircularDependency => {
                write!(f, "Circular dependency between modules")
            }
            ErrorKind::ModulePathEscapesRoot => {
                write!(f, "Module path must point to a file within root")
            }
            ErrorKind::ReplaceBackslashWithSlash => write!(f, "Replace backslash with slash"),
            ErrorKind::ModuleAlreadyImportedWithAlias => {
                write!(f, "Module already imported with an alias")
            }
            ErrorKind::ModuleAlreadyImportedWithDifferentAlias => {
                write!(f, "Module already imported with a different alias")
            }
            ErrorKind::CannotFindName { name, .. } => write!(f, "Cannot find name '{name}'"),
            ErrorKind::CannotResolveReference => write!(f, "Cannot resolve reference"),
            ErrorKind::NotARecord => write!(f, "Not a record"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::CannotReferToImportsOfImportedModule => {
                write!(f, "Cannot refer to imports of imported module")
            }
            ErrorKind::CannotReimportImportedRecord => {
                write!(f, "Cannot reimport imported record")
            }
            ErrorKind::UnusedImport => write!(f, "Unused import"),
            ErrorKind::UnusedImportAlias => write!(f, "Unused import alias"),
            ErrorKind::FieldNotFoundInStruct { struct_name, .. } => {
                write!(f, "Field not found in struct {struct_name}")
            }
            ErrorKind::MustHaveStructType => write!(f, "Must have struct type"),
            ErrorKind::DoesNotHavePrimitiveType => write!(f, "Does not have primitive type"),
            ErrorKind::MissingEntry { field } => write!(f, "Missing entry: {field}"),
            ErrorKind::VariantNotFoundInEnum { enum_name, .. } => {
                write!(f, "Variant not found in enum {enum_name}")
            }
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::TypeMismatch { expected } => write!(f, "Expected: {expected}"),
            ErrorKind::SameNumberAs { other_name, other_path } => {
                write!(f, "Same number as {other_name} in {other_path}")
            }
            ErrorKind::DuplicateFieldName { name } => {
                write!(f, "Duplicate field name '{name}'")
            }
            ErrorKind::DuplicateDeclarationName { name } => {
                write!(f, "'{name}' is already declared in this module")
            }
            ErrorKind::BadCasing { expected } => write!(f, "Expected casing: {expected}"),
            ErrorKind::Breaking { description } => write!(f, "{description}"),
        }
    }
}
