use anyhow::Result;

use super::args::{Arguments, Command};
use super::commands::{check::check, compat::compat, format::format, CommandResult};
use super::ExitStatus;

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    let result = match command {
        Some(Command::Check(args)) => check(args)?,
        Some(Command::Format(args)) => format(args)?,
        Some(Command::Compat(args)) => compat(args)?,
        None => anyhow::bail!("No command provided. Use --help to see available commands."),
    };

    if let Some(message) = &result.message {
        super::report::print_success(message);
    }

    Ok(status_for(&result))
}

fn status_for(result: &CommandResult) -> ExitStatus {
    if result.issue_count == 0 {
        ExitStatus::Success
    } else {
        ExitStatus::Failure
    }
}
