//! skir CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use skir::cli::{Arguments, ExitStatus};

fn main() -> ExitCode {
    let args = Arguments::parse();

    match skir::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitStatus::Error.into()
        }
    }
}
