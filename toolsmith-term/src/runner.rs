//! Spawning a shell command and draining it through a [`Transcript`].

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::TermError;
use crate::transcript::{Transcript, with_input_hint};

/// Options for [`run_command`].
///
/// The defaults match what the sandbox uses for every action: 32-byte reads,
/// a 256 × 2048 screen with 100 rows of scrollback, and raw output mirrored
/// to this process's stdout.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Working directory. Inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Full environment for the child. Inherited when `None`.
    pub env: Option<HashMap<String, String>>,
    /// Bytes read from the pipe per iteration.
    pub block_size: usize,
    /// Screen height in rows.
    pub rows: u16,
    /// Screen width in columns.
    pub cols: u16,
    /// Rows of history kept above the screen.
    pub scrollback: usize,
    /// Copy raw output to stdout as it arrives.
    pub mirror: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: None,
            block_size: 32,
            rows: 256,
            cols: 2048,
            scrollback: 100,
            mirror: true,
        }
    }
}

impl CommandOptions {
    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Replace the child's environment.
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Enable or disable mirroring to stdout.
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

/// Exit code and rendered transcript of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; a negated signal number if the process was killed.
    pub exit_code: i32,
    /// Terminal-rendered combined stdout/stderr.
    pub transcript: String,
}

/// Run `command` through `sh` and capture its output.
///
/// Standard input is `/dev/null` and the child gets its own process group, so
/// an interactive prompt fails with end-of-input instead of blocking. Stderr
/// is merged into stdout inside the shell so both streams keep their relative
/// order. The exit status is collected only after the pipe reaches EOF.
pub async fn run_command(command: &str, options: &CommandOptions) -> Result<CommandOutput, TermError> {
    tracing::info!(command = %command, "running command");

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(format!("exec 2>&1\n{command}"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    if let Some(env) = &options.env {
        cmd.env_clear().envs(env);
    }

    let mut child = cmd.spawn().map_err(|source| TermError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let mut transcript = Transcript::new(options.rows, options.cols, options.scrollback);
    if let Some(mut stdout) = child.stdout.take() {
        let mut mirror = options.mirror.then(tokio::io::stdout);
        let mut block = vec![0u8; options.block_size.max(1)];
        loop {
            let n = stdout.read(&mut block).await.map_err(TermError::Read)?;
            if n == 0 {
                break;
            }
            transcript.feed(&block[..n]);
            if let Some(out) = mirror.as_mut()
                && let Err(e) = out.write_all(&block[..n]).await
            {
                tracing::debug!(error = %e, "stopped mirroring command output");
                mirror = None;
            }
        }
        if let Some(out) = mirror.as_mut() {
            let _ = out.flush().await;
        }
    }

    let output = with_input_hint(transcript.render());
    let status = child.wait().await.map_err(TermError::Wait)?;
    let exit_code = status
        .code()
        .unwrap_or_else(|| -status.signal().unwrap_or(1));

    tracing::debug!(exit_code, bytes = output.len(), "command finished");
    Ok(CommandOutput {
        exit_code,
        transcript: output,
    })
}
