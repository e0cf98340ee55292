//! Glue layer (§6): the external collaborators the core compiler is
//! deliberately ignorant of — reading modules off disk, the `skir.yml`
//! data model, and the on-disk snapshot format. Nothing in here is
//! consulted by `module_set::compile`, which only ever sees an
//! in-memory `HashMap<String, String>`; everything here exists to
//! *produce* that map, or to consume the `ModuleSet` it yields.

pub mod config;
pub mod file_reader;
pub mod module_collector;
pub mod snapshot;

pub use config::Config;
pub use file_reader::{DiskFileReader, FileReader, InMemoryFileReader};
pub use module_collector::ModuleCollector;
pub use snapshot::Snapshot;
