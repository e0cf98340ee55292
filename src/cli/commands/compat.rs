use anyhow::Result;

use super::CommandResult;
use crate::cli::args::CompatArgs;
use crate::cli::report;
use crate::compat;
use crate::glue::{DiskFileReader, ModuleCollector, Snapshot};
use crate::module_set::compile;

pub fn compat(args: CompatArgs) -> Result<CommandResult> {
    let snapshot_contents = std::fs::read_to_string(&args.snapshot)?;
    let snapshot = Snapshot::parse(&snapshot_contents)?;
    if snapshot.is_corrupted() {
        anyhow::bail!("{}: snapshot is corrupted", args.snapshot.display());
    }
    let before = compile(&snapshot.modules);

    let reader = DiskFileReader::new(&args.root);
    let sources = ModuleCollector::collect(&reader)?;
    let after = compile(&sources);

    let before_methods = compat::methods_of(&before);
    let after_methods = compat::methods_of(&after);
    let changes = compat::check(&before.record_map, &after.record_map, &before_methods, &after_methods);

    if changes.is_empty() {
        return Ok(CommandResult {
            issue_count: 0,
            message: Some("No breaking changes".to_string()),
        });
    }

    report::report_breaking_changes(&changes);
    Ok(CommandResult {
        issue_count: changes.len(),
        message: None,
    })
}
