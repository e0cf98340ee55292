use anyhow::Result;

use super::CommandResult;
use crate::cli::args::FormatArgs;
use crate::formatter::format_module;
use crate::glue::{DiskFileReader, FileReader};

pub fn format(args: FormatArgs) -> Result<CommandResult> {
    let reader = DiskFileReader::new(&args.root);
    let mut module_paths = reader.list_modules()?;
    module_paths.sort();

    let mut unformatted = Vec::new();
    for module_path in &module_paths {
        let source = reader.read(module_path)?;
        let result = format_module(module_path, &source);
        if result.text_edits.is_empty() {
            continue;
        }

        if args.write {
            std::fs::write(args.root.join(module_path), &result.new_source_code)?;
        } else {
            unformatted.push(module_path.clone());
        }
    }

    if args.write {
        return Ok(CommandResult {
            issue_count: 0,
            message: Some(format!("Formatted {} module(s)", module_paths.len())),
        });
    }

    if unformatted.is_empty() {
        return Ok(CommandResult {
            issue_count: 0,
            message: Some(format!("{} module(s) already canonical", module_paths.len())),
        });
    }

    if args.check {
        for path in &unformatted {
            eprintln!("{path}: not formatted");
        }
        return Ok(CommandResult {
            issue_count: unformatted.len(),
            message: None,
        });
    }

    // Neither --write nor --check: print the would-be canonical source
    // for every module that would change, same as `rustfmt` with no
    // flags at all.
    for path in &unformatted {
        let source = reader.read(path)?;
        let result = format_module(path, &source);
        println!("{}", result.new_source_code);
    }
    Ok(CommandResult {
        issue_count: unformatted.len(),
        message: None,
    })
}
