use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use jblocks_runtime::DebugCoordinator;
use jblocks_runtime::DebugNotice;
use jblocks_runtime::ProcessOutput;
use jblocks_runtime::RunConfig;
use jblocks_runtime::RuntimeError;
use jblocks_workspace::EditorSession;
use jblocks_workspace::EventBus;

#[derive(Debug, Parser)]
pub struct Debug {
    /// Source file to run.
    file: Utf8PathBuf,

    /// Lines to break on (e.g. --break 4,7). Without any, execution
    /// pauses once at the first statement.
    #[arg(long = "break", value_delimiter = ',')]
    breakpoints: Vec<u32>,

    /// Step line by line from each pause instead of resuming.
    #[arg(long)]
    step: bool,
}

impl Debug {
    pub async fn execute(&self, quiet: bool) -> Result<ExitCode> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let settings = jblocks_conf::Settings::new(&cwd).context("failed to load settings")?;

        let text = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file))?;
        let mut session = EditorSession::new(
            format!("file://{}", self.file),
            text,
            EventBus::default(),
        );

        for &line in &self.breakpoints {
            let Some(block) = session.snapshot().map.block_at_line(line) else {
                tracing::warn!(line, "no block on breakpoint line, skipping");
                continue;
            };
            session.toggle_breakpoint(block);
        }

        let main_class = self
            .file
            .file_stem()
            .map_or_else(|| settings.main_class.clone(), str::to_owned);
        let config = RunConfig {
            java: settings.java_path()?,
            javac: settings.javac_path()?,
            out_dir: settings.out_dir.clone(),
            main_class,
            extra_flags: settings.extra_flags.clone(),
            attach_retries: settings.attach_retries,
            attach_delay: Duration::from_millis(settings.attach_delay_ms),
            shutdown_grace: Duration::from_millis(settings.shutdown_grace_ms),
        };

        let snapshot = session.snapshot();
        let mut coordinator = match DebugCoordinator::start(
            config,
            snapshot.document.text(),
            &snapshot.blocks,
            &snapshot.map,
        )
        .await
        {
            Ok(coordinator) => coordinator,
            Err(RuntimeError::Compile(failure)) => {
                eprintln!("{}", failure.message());
                if !quiet && failure.friendly.is_some() {
                    eprintln!("---\n{}", failure.raw.trim_end());
                }
                return Ok(ExitCode::FAILURE);
            }
            Err(error) => return Err(error.into()),
        };

        while let Some(notice) = coordinator.next_notice().await {
            match notice {
                DebugNotice::Output(ProcessOutput::Stdout(line)) => println!("{line}"),
                DebugNotice::Output(ProcessOutput::Stderr(line)) => eprintln!("{line}"),
                DebugNotice::Attached => {
                    if !quiet {
                        eprintln!("attached");
                    }
                }
                DebugNotice::Paused { line, block } => {
                    match (line, block) {
                        (Some(line), Some(block)) => {
                            eprintln!("paused at line {line} (block {})", block.raw());
                        }
                        (Some(line), None) => eprintln!("paused at line {line}"),
                        _ => eprintln!("paused"),
                    }
                    if self.step {
                        coordinator.step_over();
                    } else {
                        coordinator.resume();
                    }
                }
                DebugNotice::Resumed => {}
                DebugNotice::Finished => {
                    if !quiet {
                        eprintln!("finished");
                    }
                }
            }
        }

        coordinator.stop().await;
        Ok(ExitCode::SUCCESS)
    }
}
