mod debug;
mod edit;
mod inspect;

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum JblocksCommand {
    /// Parse a source file and print its block tree
    Inspect(self::inspect::Inspect),
    /// Apply one structural edit and print the resulting source
    Edit(self::edit::Edit),
    /// Compile, launch, and run a file under the debugger
    Debug(self::debug::Debug),
}

impl JblocksCommand {
    pub async fn execute(&self, quiet: bool) -> Result<ExitCode> {
        match self {
            JblocksCommand::Inspect(cmd) => cmd.execute(quiet),
            JblocksCommand::Edit(cmd) => cmd.execute(),
            JblocksCommand::Debug(cmd) => cmd.execute(quiet).await,
        }
    }
}
