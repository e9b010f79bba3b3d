use std::{
  io::{self, Read},
  path::Path,
  process::{Child, Command, ExitStatus, Stdio},
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

/// Everything captured from one bounded compiler invocation. The exit status
/// is carried but deliberately not checked: a compiler that rejects its input
/// still took a measurable amount of time to do so.
pub struct TimedOutput {
  pub status: ExitStatus,
  pub elapsed: Duration,
  pub stdout: String,
  pub stderr: String,
}

#[extend::ext(name = ChildExt)]
pub impl Child {
  /// Waits for the child with a timeout. On timeout the child is killed and
  /// `Ok(None)` is returned.
  fn wait_or_kill(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
    let Some(status) = self.wait_timeout(timeout).context("wait")? else {
      self.kill().context("kill after timeout")?;
      self.wait().context("reap after kill")?;

      return Ok(None);
    };

    Ok(Some(status))
  }
}

#[extend::ext(name = CommandExt)]
pub impl Command {
  /// Runs the command to completion, capturing stdout and stderr and timing
  /// the wall clock from spawn to exit. Returns `Ok(None)` on timeout.
  fn timed_output(&mut self, timeout: Duration) -> Result<Option<TimedOutput>> {
    let start = Instant::now();

    let mut child = self
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .context("spawn")?;

    // Both pipes must be drained while the child runs: a compiler emitting
    // more diagnostics than the pipe buffer holds would block on write and
    // look like a hang.
    let stdout = drain(child.stdout.take().context("stdout")?);
    let stderr = drain(child.stderr.take().context("stderr")?);

    let Some(status) = child.wait_or_kill(timeout)? else {
      return Ok(None);
    };

    let elapsed = start.elapsed();

    Ok(Some(TimedOutput {
      status,
      elapsed,
      stdout: join_reader(stdout).context("read stdout")?,
      stderr: join_reader(stderr).context("read stderr")?,
    }))
  }
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<io::Result<String>> {
  thread::spawn(move || {
    let mut buffer = String::new();
    stream.read_to_string(&mut buffer)?;

    Ok(buffer)
  })
}

fn join_reader(reader: JoinHandle<io::Result<String>>) -> Result<String> {
  match reader.join() {
    Ok(buffer) => Ok(buffer?),
    Err(_) => anyhow::bail!("reader thread panicked"),
  }
}

#[extend::ext(name = PathExt)]
pub impl Path {
  /// Shortens a path under `$HOME` to a `~/`-prefixed form, for display only.
  fn home_relative(&self) -> String {
    let Some(home) = std::env::var_os("HOME") else {
      return self.display().to_string();
    };

    match self.strip_prefix(&home) {
      Ok(rest) => format!("~/{}", rest.display()),
      Err(_) => self.display().to_string(),
    }
  }
}

#[extend::ext(name = StrExt)]
pub impl str {
  /// The first line, trimmed. Version banners put the interesting part there.
  fn first_line(&self) -> &str {
    self.lines().next().unwrap_or("").trim()
  }
}
