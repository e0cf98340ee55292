use anyhow::Result;

use super::CommandResult;
use crate::cli::args::CheckArgs;
use crate::cli::report;
use crate::glue::{DiskFileReader, ModuleCollector};
use crate::module_set::compile;

pub fn check(args: CheckArgs) -> Result<CommandResult> {
    let reader = DiskFileReader::new(&args.root);
    let sources = ModuleCollector::collect(&reader)?;
    let set = compile(&sources);
    let errors = set.all_errors();

    if errors.is_empty() {
        return Ok(CommandResult {
            issue_count: 0,
            message: Some(format!("Checked {} module(s) - no issues found", set.module_count())),
        });
    }

    report::report_errors(&errors);
    Ok(CommandResult {
        issue_count: errors.len(),
        message: None,
    })
}
