use std::{collections::BTreeMap, fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::{
  generate::{self, GeneratedProgram},
  lang::{GenMode, Lang, Op},
  run,
  stats::{Key, Measurement, Stats},
  toolchain::{self, Resolver},
};

/// What one benchmark run varies over, fed through from the CLI.
pub struct Config {
  pub langs: Vec<Lang>,
  pub ops: Vec<Op>,
  pub fns: usize,
  pub depth: usize,
  pub runs: u32,
  pub reference: Lang,
  pub out_dir: PathBuf,
  pub timeout: Duration,
}

pub struct Bench<'a> {
  config: Config,
  resolve: &'a Resolver<'a>,
  /// Generated programs indexed by the identity computed in phase one.
  programs: BTreeMap<(Lang, GenMode), GeneratedProgram>,
  /// Measurements collected across the whole run.
  pub stats: Stats,
}

impl<'a> Bench<'a> {
  pub fn new(config: Config, resolve: &'a Resolver<'a>) -> Result<Self> {
    fs::create_dir_all(&config.out_dir).with_context(|| format!("create {:?}", config.out_dir))?;

    let stats = Stats::new(config.reference);

    Ok(Self {
      config,
      resolve,
      programs: BTreeMap::new(),
      stats,
    })
  }

  /// Two-phase: every requested program is generated before any toolchain is
  /// invoked, since the measurement phase indexes programs by the identity
  /// computed during generation.
  pub fn bench(&mut self) -> Result<()> {
    self.generate_all().context("generate all")?;
    self.measure_all().context("measure all")?;

    Ok(())
  }

  fn generate_all(&mut self) -> Result<()> {
    for &lang in &self.config.langs {
      for &mode in lang.gen_modes() {
        eprintln!("generating {lang} ({mode})");

        match generate::generate(lang, mode, self.config.fns, self.config.depth, &self.config.out_dir) {
          Ok(program) => {
            eprintln!("  wrote {path:?} ({ty})", path = program.path, ty = program.numeric_type);
            self.programs.insert((lang, mode), program);
          }
          // Fatal to this language only; every other language still runs.
          Err(err) => eprintln!("  skipping {lang}: {err:#}"),
        }
      }
    }

    Ok(())
  }

  fn measure_all(&mut self) -> Result<()> {
    for ((lang, mode), program) in &self.programs {
      // Toolchains run from a scratch directory, so the program path must
      // survive the change of working directory.
      let program_path = program.path.canonicalize().with_context(|| format!("canonicalize {:?}", program.path))?;

      for &op in &self.config.ops {
        for toolchain in toolchain::toolchains_for(*lang, op, self.resolve) {
          eprintln!("benchmarking {lang} ({mode}, {op}) with {bin:?}", bin = toolchain.bin);

          let key = Key {
            lang: *lang,
            gen_mode: *mode,
            op,
            bin: toolchain.bin.clone(),
          };

          match run::measure(&toolchain, &program_path, self.config.runs, self.config.timeout) {
            Ok(duration) => {
              self.stats.record(
                key,
                Measurement {
                  duration,
                  version: toolchain.version.clone(),
                },
              );
            }
            // One omitted row, never a failed run.
            Err(err) => eprintln!("  skipping: {err:#}"),
          }
        }
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, path::Path};

  use tempfile::TempDir;

  use super::*;

  fn fake_bin(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");

    path
  }

  fn config(langs: Vec<Lang>, ops: Vec<Op>, out_dir: &Path) -> Config {
    Config {
      langs,
      ops,
      fns: 2,
      depth: 2,
      runs: 2,
      reference: Lang::D,
      out_dir: out_dir.to_path_buf(),
      timeout: Duration::from_secs(10),
    }
  }

  #[test]
  fn generates_then_measures_every_available_combination() {
    let bin_dir = TempDir::with_prefix("compbench-test-").expect("tempdir");
    let out_dir = TempDir::with_prefix("compbench-test-").expect("tempdir");

    let bins = HashMap::from([(
      "rustc".to_string(),
      fake_bin(bin_dir.path(), "rustc", "echo 'rustc 1.77.0'"),
    )]);
    let resolve = move |name: &str| bins.get(name).cloned();

    let mut bench = Bench::new(
      config(vec![Lang::Rust], vec![Op::Check, Op::Build], out_dir.path()),
      &resolve,
    )
    .expect("new");
    bench.bench().expect("bench");

    // Rust generates in both generic modes; one rustc binding per op.
    let rows = bench.stats.rows();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.lang == Lang::Rust && row.version == "rustc 1.77.0"));

    assert!(out_dir.path().join("chains_rust_untemplated.rs").exists());
    assert!(out_dir.path().join("chains_rust_templated.rs").exists());
  }

  #[test]
  fn unsupported_language_skips_without_aborting_the_run() {
    let bin_dir = TempDir::with_prefix("compbench-test-").expect("tempdir");
    let out_dir = TempDir::with_prefix("compbench-test-").expect("tempdir");

    let bins = HashMap::from([(
      "rustc".to_string(),
      fake_bin(bin_dir.path(), "rustc", "echo 'rustc 1.77.0'"),
    )]);
    let resolve = move |name: &str| bins.get(name).cloned();

    let mut bench = Bench::new(config(vec![Lang::V, Lang::Rust], vec![Op::Build], out_dir.path()), &resolve).expect("new");
    bench.bench().expect("bench");

    assert!(bench.stats.rows().iter().all(|row| row.lang == Lang::Rust));
    assert!(!out_dir.path().join("chains_v_untemplated.v").exists());
    assert!(out_dir.path().join("chains_rust_untemplated.rs").exists());
  }

  #[test]
  fn no_available_toolchains_means_an_empty_report() {
    let out_dir = TempDir::with_prefix("compbench-test-").expect("tempdir");

    let resolve = |_: &str| -> Option<PathBuf> { None };

    let mut bench = Bench::new(config(vec![Lang::Go], vec![Op::Check, Op::Build], out_dir.path()), &resolve).expect("new");
    bench.bench().expect("bench");

    assert!(bench.stats.is_empty());
    // The program is still generated; only the measurements are missing.
    assert!(out_dir.path().join("chains_go_untemplated.go").exists());
  }
}
