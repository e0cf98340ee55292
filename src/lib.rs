//! skir - a schema language compiler front end.
//!
//! skir compiles `.skir` schema modules into the resolved declaration
//! graph described by the cross-module resolver, then hands that graph
//! to a handful of independent analyses: stable-identifier uniqueness,
//! breaking-change compatibility between two compiled snapshots, a
//! canonical formatter, and a definition/reference finder for editor
//! tooling. The compiler itself never touches a filesystem; everything
//! that does lives in `glue`.
//!
//! ## Module Structure
//!
//! - `token`/`position`: source positions and the token type shared by
//!   every later stage
//! - `tokenizer`: source text -> token stream
//! - `ast`: the syntactic tree a module parses into
//! - `parser`: token stream -> `ParsedModule`, in strict or lenient mode
//! - `doc_comment`: `///` comment parsing and `[reference]` resolution
//! - `error`: the `SkirError`/`ErrorKind` diagnostic model shared by
//!   every pass
//! - `resolved`: the resolved declaration/type model (`Record`,
//!   `Method`, `Constant`, `ResolvedType`) that `module_set` produces
//! - `module_set`: cross-module name/type resolution, constant
//!   evaluation, uniqueness and casing checks
//! - `compat`: breaking-change detection between two `ModuleSet`s
//! - `formatter`: canonical re-rendering and minimal text edits
//! - `finder`: definition/reference lookup for editor tooling
//! - `glue`: the external collaborators the core is deliberately
//!   ignorant of (file reading, `skir.yml`, the snapshot format)
//! - `cli`: the command-line entry point built on top of all of the
//!   above

pub mod ast;
pub mod cli;
pub mod compat;
pub mod doc_comment;
pub mod error;
pub mod finder;
pub mod formatter;
pub mod glue;
pub mod module_set;
pub mod position;
pub mod resolved;
pub mod token;
pub mod tokenizer;
pub mod parser;
