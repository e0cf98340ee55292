//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `check`: compile every `.skir` module under a root and report
//!   diagnostics
//! - `format`: print or rewrite a module's canonical form
//! - `compat`: compare a snapshot's tracked records against the
//!   current modules and report breaking changes

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            use clap::CommandFactory;
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Root directory to scan for `.skir` modules
    pub root: PathBuf,
}

#[derive(Debug, Parser)]
pub struct FormatArgs {
    /// Root directory to scan for `.skir` modules
    pub root: PathBuf,

    /// Write the canonical form back to disk instead of printing edits
    #[arg(long)]
    pub write: bool,

    /// Exit with a failure status if any module is not already
    /// canonical, without writing anything
    #[arg(long, conflicts_with = "write")]
    pub check: bool,
}

#[derive(Debug, Parser)]
pub struct CompatArgs {
    /// Path to a `skir-snapshot.json` file
    pub snapshot: PathBuf,

    /// Root directory holding the current modules to compare against
    pub root: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile every module under a root and report diagnostics
    Check(CheckArgs),
    /// Print or rewrite modules in canonical form
    Format(FormatArgs),
    /// Report breaking changes between a snapshot and the current modules
    Compat(CompatArgs),
}
