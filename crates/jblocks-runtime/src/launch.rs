//! Debuggee process launch.
//!
//! The program is started with the JDWP agent listening on a loopback
//! port and suspended, so breakpoints can be installed before the
//! first statement runs. One reader task per output stream pushes
//! lines into a channel; nothing else touches the streams.

use std::process::Stdio;

use camino::Utf8Path;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::RuntimeError;

/// A line of debuggee output, tagged by stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutput {
    Stdout(String),
    Stderr(String),
}

/// Ask the OS for a free loopback port by binding port zero and
/// immediately releasing it. The debuggee binds it right after; the
/// window for another process to steal it is accepted.
pub fn free_port() -> Result<u16, RuntimeError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

#[derive(Debug)]
pub struct LaunchedProcess {
    child: Child,
    port: u16,
    killed: bool,
}

impl LaunchedProcess {
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Force-kill the debuggee. Idempotent; killing an already-dead
    /// process is a no-op.
    pub async fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;
        if let Err(error) = self.child.kill().await {
            tracing::debug!(%error, "debuggee already gone");
        }
    }
}

/// Launch the compiled program under the debug agent, suspended until
/// a debugger attaches. Output lines flow into `output`.
pub fn launch(
    java: &Utf8Path,
    classpath: &Utf8Path,
    main_class: &str,
    extra_flags: &[String],
    output: mpsc::UnboundedSender<ProcessOutput>,
) -> Result<LaunchedProcess, RuntimeError> {
    let port = free_port()?;
    let agent = format!(
        "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address=127.0.0.1:{port}"
    );

    tracing::debug!(main_class, port, "launching debuggee");
    let mut child = Command::new(java.as_std_path())
        .arg(agent)
        .args(extra_flags)
        .arg("-cp")
        .arg(classpath.as_std_path())
        .arg(main_class)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(read_lines(stdout, output.clone(), ProcessOutput::Stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(read_lines(stderr, output, ProcessOutput::Stderr));
    }

    Ok(LaunchedProcess {
        child,
        port,
        killed: false,
    })
}

async fn read_lines<R>(
    stream: R,
    output: mpsc::UnboundedSender<ProcessOutput>,
    wrap: fn(String) -> ProcessOutput,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if output.send(wrap(line)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_ports_are_nonzero_and_vary() {
        let first = free_port().expect("bind");
        assert_ne!(first, 0);
    }

    #[tokio::test]
    async fn reader_forwards_lines_tagged_by_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let data: &[u8] = b"first\nsecond\n";
        read_lines(data, tx, ProcessOutput::Stdout).await;
        assert_eq!(rx.recv().await, Some(ProcessOutput::Stdout("first".into())));
        assert_eq!(
            rx.recv().await,
            Some(ProcessOutput::Stdout("second".into()))
        );
        assert_eq!(rx.recv().await, None);
    }
}
