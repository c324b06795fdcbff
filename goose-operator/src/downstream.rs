//! Downstream agent process adapter.
//!
//! Owns the child process. Streaming mode hands out a [`DownstreamWriter`]
//! over the child's stdin and a frame reader over its stdout; the two have
//! independent failure domains. One-shot mode runs the agent to completion
//! with the composed prompt as its final argument.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use goose_operator_core::StreamDirection;

use crate::error::OperatorError;
use crate::framing::FrameReader;

/// Executable plus arguments, before `PATH` resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DownstreamCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args...]` vector, as given after `--`.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    /// Locate the executable on `PATH`.
    ///
    /// A missing executable is fatal; it cannot appear mid-session.
    pub fn resolve(&self) -> Result<PathBuf, OperatorError> {
        which::which(&self.program).map_err(|e| {
            tracing::debug!(command = %self.program, error = %e, "PATH lookup failed");
            OperatorError::DownstreamNotFound {
                command: self.program.clone(),
            }
        })
    }
}

impl std::fmt::Display for DownstreamCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming Process
// ─────────────────────────────────────────────────────────────────────────────

/// A running streaming agent.
pub struct Downstream {
    pub child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
}

impl Downstream {
    /// Spawn the agent with piped stdin/stdout and inherited stderr.
    ///
    /// The child gets its own process group so shutdown can signal the
    /// whole tree.
    pub fn spawn(command: &DownstreamCommand) -> Result<Self, OperatorError> {
        let program = command.resolve()?;

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| OperatorError::DownstreamSpawn {
            command: program.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            command = %command,
            pid = child.id(),
            state = "running",
            "downstream process spawned"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    /// Take the stdin writer and stdout frame reader. Callable once.
    pub fn take_pipes(
        &mut self,
    ) -> Result<(DownstreamWriter<ChildStdin>, FrameReader<BufReader<ChildStdout>>), OperatorError>
    {
        let stdin = self
            .stdin
            .take()
            .ok_or_else(|| OperatorError::DownstreamSpawn {
                command: "downstream".to_string(),
                reason: "failed to capture downstream stdin".to_string(),
            })?;
        let stdout = self
            .stdout
            .take()
            .ok_or_else(|| OperatorError::DownstreamSpawn {
                command: "downstream".to_string(),
                reason: "failed to capture downstream stdout".to_string(),
            })?;
        Ok((
            DownstreamWriter::new(stdin),
            FrameReader::new(BufReader::new(stdout), StreamDirection::AgentToClient),
        ))
    }
}

/// Line writer over the agent's stdin.
pub struct DownstreamWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> DownstreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one line plus `\n`, then flush.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot Invocation
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a one-shot agent run.
#[derive(Debug)]
pub struct OneshotOutput {
    /// Exit code, or `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl OneshotOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run the agent once with `prompt` as its last argument and capture output.
pub async fn invoke_once(
    command: &DownstreamCommand,
    prompt: &str,
) -> Result<OneshotOutput, OperatorError> {
    let program = command.resolve()?;

    let output = Command::new(&program)
        .args(&command.args)
        .arg(prompt)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| OperatorError::DownstreamSpawn {
            command: program.display().to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!(
        command = %command,
        code = output.status.code(),
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "one-shot downstream finished"
    );

    Ok(OneshotOutput {
        code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
