mod bench;
mod ext;
mod format;
mod generate;
mod lang;
mod run;
mod stats;
mod toolchain;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use self::{
  bench::{Bench, Config},
  lang::{Lang, Op},
};

#[derive(Parser)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Generate call-chain programs and time every available compiler on them.
  Bench {
    /// Languages to generate and benchmark.
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![
      Lang::C, Lang::Cpp, Lang::D, Lang::Rust, Lang::Go, Lang::Zig, Lang::Java, Lang::OCaml,
    ])]
    langs: Vec<Lang>,
    /// Compiler operations to measure.
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![Op::Check, Op::Build])]
    ops: Vec<Op>,
    /// Call chains per generated program.
    #[arg(long, default_value_t = 100)]
    function_count: usize,
    /// Functions per chain.
    #[arg(long, default_value_t = 5)]
    call_depth: usize,
    /// Repetitions per toolchain; the minimum duration is kept.
    #[arg(short, long, default_value_t = 3)]
    runs: u32,
    /// Language whose timings are the denominator for speedup factors.
    #[arg(long, default_value_t = Lang::D)]
    reference: Lang,
    /// Directory generated programs are written to.
    #[arg(long, default_value = "./generated")]
    out_dir: PathBuf,
    /// Per-invocation timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
  },
}

fn main() -> Result<()> {
  match Args::parse().command {
    Command::Bench {
      langs,
      ops,
      function_count,
      call_depth,
      runs,
      reference,
      out_dir,
      timeout_secs,
    } => {
      if function_count == 0 || call_depth == 0 || runs == 0 || timeout_secs == 0 {
        anyhow::bail!("function-count, call-depth, runs, and timeout-secs must all be at least 1");
      }

      let config = Config {
        langs,
        ops,
        fns: function_count,
        depth: call_depth,
        runs,
        reference,
        out_dir,
        timeout: Duration::from_secs(timeout_secs),
      };

      let resolve: &toolchain::Resolver = &toolchain::resolve_in_path;
      let mut bench = Bench::new(config, resolve).context("Bench::new")?;
      bench.bench().context("bench")?;

      if bench.stats.is_empty() {
        eprintln!("no requested toolchain is available on this host");
      }

      println!("{}", format::format(&bench.stats).context("format")?);
    }
  }

  Ok(())
}
