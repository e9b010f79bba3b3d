use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::{
  ext::{CommandExt, StrExt},
  toolchain::Toolchain,
};

/// Runs `toolchain` against `program` `runs` times and returns the minimum
/// observed wall-clock duration. Minimum, not mean: it estimates best-case
/// compiler throughput and sheds scheduling jitter.
///
/// A non-zero exit status is not a failure, the duration is recorded either
/// way; "how long did the compiler take to accept or reject this input" is
/// the measured quantity. Only failing to invoke the binary at all (or a
/// timeout) errors, and the caller skips just that one measurement.
pub fn measure(toolchain: &Toolchain, program: &Path, runs: u32, timeout: Duration) -> Result<Duration> {
  // Repetitions share this directory for compiler artifacts, so they must
  // run sequentially relative to each other.
  let work = TempDir::with_prefix("compbench-").context("tempdir")?;

  let mut durations = Vec::with_capacity(runs as usize);
  for run in 0..runs {
    let output = toolchain
      .command(program, work.path())
      .timed_output(timeout)
      .with_context(|| format!("invoke {:?}", toolchain.bin))?
      .with_context(|| format!("{:?} timed out after {timeout:?}", toolchain.bin))?;

    if run == 0 && !output.status.success() && !output.stderr.trim().is_empty() {
      eprintln!(
        "    {:?} exited with {}: {}",
        toolchain.bin,
        output.status,
        output.stderr.first_line()
      );
    }

    durations.push(output.elapsed);
  }

  min_duration(durations).context("zero runs requested")
}

pub(crate) fn min_duration<I: IntoIterator<Item = Duration>>(durations: I) -> Option<Duration> {
  durations.into_iter().min()
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, fs, path::PathBuf};

  use super::*;
  use crate::{
    lang::{Lang, Op},
    toolchain::toolchains_for,
  };

  fn fake_rustc(dir: &Path, script: &str) -> Toolchain {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("rustc");
    fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");

    let bins = HashMap::from([("rustc".to_string(), path)]);
    let resolve = move |name: &str| -> Option<PathBuf> { bins.get(name).cloned() };

    toolchains_for(Lang::Rust, Op::Build, &resolve).remove(0)
  }

  #[test]
  fn minimum_of_repetitions_is_kept() {
    let durations = [Duration::from_secs_f64(3.0), Duration::from_secs_f64(1.5), Duration::from_secs_f64(2.2)];

    assert_eq!(min_duration(durations), Some(Duration::from_secs_f64(1.5)));
    assert_eq!(min_duration(Vec::new()), None);
  }

  #[test]
  fn measure_times_the_invocation() {
    let dir = TempDir::with_prefix("compbench-test-").expect("tempdir");
    let toolchain = fake_rustc(dir.path(), "sleep 0.05");

    let duration = measure(&toolchain, Path::new("chains.rs"), 2, Duration::from_secs(10)).expect("measure");

    assert!(duration >= Duration::from_millis(50), "{duration:?}");
  }

  #[test]
  fn rejected_input_still_yields_a_duration() {
    let dir = TempDir::with_prefix("compbench-test-").expect("tempdir");
    let toolchain = fake_rustc(dir.path(), "echo 'error: expected item' >&2; exit 1");

    measure(&toolchain, Path::new("chains.rs"), 3, Duration::from_secs(10)).expect("measure");
  }

  #[test]
  fn hung_toolchain_is_bounded_by_the_timeout() {
    let dir = TempDir::with_prefix("compbench-test-").expect("tempdir");
    let toolchain = fake_rustc(dir.path(), "sleep 5");

    let err = measure(&toolchain, Path::new("chains.rs"), 1, Duration::from_millis(50)).expect_err("timeout");

    assert!(err.to_string().contains("timed out"), "{err}");
  }
}
