use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::commands::JblocksCommand;
use crate::logging;

#[derive(Parser)]
#[command(name = "jblocks")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: JblocksCommand,

    /// Only print errors and the command's own output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Increase log detail; repeat for more.
    #[arg(global = true, long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }
}

/// Parse CLI arguments and execute the chosen command
pub async fn run(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    logging::init(cli.log_level());
    cli.command.execute(cli.quiet).await
}
