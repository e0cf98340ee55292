//! CLI layer: argument parsing, command dispatch, and diagnostic
//! reporting built on top of the compiler core.
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions using clap
//! - `commands`: command implementations (`check`, `format`, `compat`)
//! - `exit_status`: exit status codes
//! - `report`: cargo-style diagnostic rendering
//! - `run`: command dispatcher

use std::process::ExitCode;

use anyhow::Result;

pub use args::{Arguments, Command};
pub use exit_status::ExitStatus;

pub mod args;
pub mod commands;
mod exit_status;
pub mod report;
mod run;

pub fn run_cli(args: Arguments) -> Result<ExitCode> {
    let Some(args) = args.with_command_or_help() else {
        return Ok(ExitCode::from(0));
    };

    let status = run::run(args)?;
    Ok(status.into())
}
