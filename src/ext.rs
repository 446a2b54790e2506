use std::{
  io::{self, Read},
  process::{Child, Command, ExitStatus, Stdio},
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use tempfile::{Builder, NamedTempFile};
use wait_timeout::ChildExt as WaitExt;

use crate::cancel::{Cancel, Interrupted};

/// How often a waiting child is checked for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
  #[error("exited with {status}\n\n{stdout}\n\n{stderr}")]
  Status {
    status: ExitStatus,
    stdout: String,
    stderr: String,
  },
  #[error("wrote to stderr:\n{0}")]
  Diagnostics(String),
  #[error("timed out after {0:?}")]
  Timeout(Duration),
}

#[extend::ext]
pub impl Child {
  /// Blocks until the child exits. If `cancel` fires, or `timeout` elapses,
  /// the child is killed and reaped first. A child that exits after `cancel`
  /// fired (e.g. from the same Ctrl-C) also yields [`Interrupted`].
  fn wait_cancellable(&mut self, cancel: &Cancel, timeout: Option<Duration>) -> Result<ExitStatus> {
    let start = Instant::now();

    loop {
      if let Some(status) = self.wait_timeout(POLL_INTERVAL).context("wait")? {
        cancel.check()?;
        return Ok(status);
      }

      if cancel.is_cancelled() {
        self.kill_and_reap();
        return Err(Interrupted.into());
      }

      if let Some(timeout) = timeout.filter(|timeout| start.elapsed() > *timeout) {
        self.kill_and_reap();
        return Err(CaptureError::Timeout(timeout).into());
      }
    }
  }

  fn kill_and_reap(&mut self) {
    if let Err(err) = self.kill() {
      tracing::debug!("failed to kill child {}: {err}", self.id());
      return;
    }

    match self.wait() {
      Ok(status) => tracing::debug!("reaped child {}: {status}", self.id()),
      Err(err) => tracing::debug!("failed to reap child {}: {err}", self.id()),
    }
  }
}

#[extend::ext]
pub impl Command {
  /// Runs the command to completion and returns its stdout. Both output
  /// streams are drained concurrently with the wait, and both readers are
  /// joined before the exit status is looked at. A killed child's readers are
  /// left behind, since its descendants may still hold the pipes.
  ///
  /// # Errors
  ///
  /// This will return an error if:
  /// - the exit status is non-zero.
  /// - anything was written to stderr.
  /// - `timeout` elapsed, or `cancel` fired ([`Interrupted`]).
  fn capture(&mut self, cancel: &Cancel, timeout: Option<Duration>) -> Result<String> {
    tracing::debug!("running {self:?}");

    let mut child = self
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .context("spawn")?;

    let stdout = drain(child.stdout.take().context("stdout")?);
    let stderr = drain(child.stderr.take().context("stderr")?);

    let status = child.wait_cancellable(cancel, timeout)?;

    let stdout = join(stdout).context("read stdout")?;
    let stderr = join(stderr).context("read stderr")?;

    if !status.success() {
      return Err(CaptureError::Status { status, stdout, stderr }.into());
    }

    if !stderr.is_empty() {
      return Err(CaptureError::Diagnostics(stderr).into());
    }

    Ok(stdout)
  }
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<io::Result<String>> {
  thread::spawn(move || {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
  })
}

fn join(handle: JoinHandle<io::Result<String>>) -> Result<String> {
  match handle.join() {
    Ok(output) => Ok(output?),
    Err(_) => anyhow::bail!("reader thread panicked"),
  }
}

#[extend::ext]
pub impl NamedTempFile {
  fn with_affixes(prefix: &str, suffix: &str) -> Result<NamedTempFile> {
    Builder::new().prefix(prefix).suffix(suffix).tempfile().context("tempfile")
  }
}
