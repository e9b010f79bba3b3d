use std::{
  env, fs,
  path::{Path, PathBuf},
  process::Command,
  time::Duration,
};

use crate::{
  ext::{CommandExt, StrExt},
  lang::{Lang, Op},
};

/// Placeholder when a compiler's version banner cannot be obtained or parsed.
pub const UNKNOWN_VERSION: &str = "unknown";

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// One resolved compiler binary, bound to a language and an operation.
/// Multiple bindings per (lang, op) are expected: different compiler
/// families, and different versioned binaries within a family.
#[derive(Clone, Debug)]
pub struct Toolchain {
  pub lang: Lang,
  pub op: Op,
  pub bin: PathBuf,
  pub version: String,
  /// Operation flags, passed before the source file.
  args: &'static [&'static str],
}

impl Toolchain {
  /// The invocation to measure: flags, then the program path, artifacts
  /// dropped into `work_dir`.
  pub fn command(&self, program: &Path, work_dir: &Path) -> Command {
    let mut cmd = Command::new(&self.bin);
    cmd.current_dir(work_dir).args(self.args).arg(program);

    cmd
  }
}

/// One compiler distribution: a canonical binary name, optionally a range of
/// versioned `<base>-<n>` binaries, and its flag conventions.
struct Family {
  base: &'static str,
  /// Inclusive `<base>-<lo>` ..= `<base>-<hi>` scan, for families that ship
  /// versioned binaries alongside (or instead of) the canonical name.
  versions: Option<(u32, u32)>,
  version_args: &'static [&'static str],
  check_args: Option<&'static [&'static str]>,
  build_args: Option<&'static [&'static str]>,
}

impl Family {
  fn args_for(&self, op: Op) -> Option<&'static [&'static str]> {
    match op {
      Op::Check => self.check_args,
      Op::Build => self.build_args,
    }
  }

  fn candidate_names(&self) -> Vec<String> {
    let mut names = vec![self.base.to_string()];
    if let Some((lo, hi)) = self.versions {
      names.extend((lo..=hi).map(|n| format!("{}-{n}", self.base)));
    }

    names
  }
}

const GCC_VERSIONS: (u32, u32) = (5, 14);
const CLANG_VERSIONS: (u32, u32) = (8, 18);

fn families(lang: Lang) -> &'static [Family] {
  match lang {
    Lang::C => &[
      Family {
        base: "gcc",
        versions: Some(GCC_VERSIONS),
        version_args: &["--version"],
        check_args: Some(&["-fsyntax-only"]),
        build_args: Some(&["-c"]),
      },
      Family {
        base: "clang",
        versions: Some(CLANG_VERSIONS),
        version_args: &["--version"],
        check_args: Some(&["-fsyntax-only"]),
        build_args: Some(&["-c"]),
      },
    ],
    Lang::Cpp => &[
      Family {
        base: "g++",
        versions: Some(GCC_VERSIONS),
        version_args: &["--version"],
        check_args: Some(&["-fsyntax-only"]),
        build_args: Some(&["-c"]),
      },
      Family {
        base: "clang++",
        versions: Some(CLANG_VERSIONS),
        version_args: &["--version"],
        check_args: Some(&["-fsyntax-only"]),
        build_args: Some(&["-c"]),
      },
    ],
    Lang::D => &[
      Family {
        base: "dmd",
        versions: None,
        version_args: &["--version"],
        check_args: Some(&["-o-"]),
        build_args: Some(&["-c"]),
      },
      Family {
        base: "ldc2",
        versions: None,
        version_args: &["--version"],
        check_args: Some(&["-o-"]),
        build_args: Some(&["-c"]),
      },
    ],
    Lang::Rust => &[Family {
      base: "rustc",
      versions: None,
      version_args: &["--version"],
      check_args: Some(&["--emit=metadata"]),
      build_args: Some(&["--emit=obj"]),
    }],
    Lang::Go => &[Family {
      base: "go",
      versions: None,
      version_args: &["version"],
      // gc has no check-only entry point worth benchmarking.
      check_args: None,
      build_args: Some(&["build"]),
    }],
    Lang::Zig => &[Family {
      base: "zig",
      versions: None,
      version_args: &["version"],
      check_args: Some(&["ast-check"]),
      build_args: Some(&["build-obj"]),
    }],
    Lang::Java => &[Family {
      base: "javac",
      versions: None,
      version_args: &["-version"],
      check_args: None,
      build_args: Some(&["-d", "."]),
    }],
    Lang::OCaml => &[
      Family {
        base: "ocamlc",
        versions: None,
        version_args: &["-version"],
        check_args: Some(&["-stop-after", "typing"]),
        build_args: None,
      },
      Family {
        base: "ocamlopt",
        versions: None,
        version_args: &["-version"],
        check_args: None,
        build_args: Some(&["-c"]),
      },
    ],
    // No generator rules yet, so nothing to hand a compiler.
    Lang::V => &[],
  }
}

/// Maps a candidate binary name to its path on this host, or `None` when the
/// binary is not available. Injected so tests can supply a fake host.
pub type Resolver<'a> = dyn Fn(&str) -> Option<PathBuf> + 'a;

/// Every available toolchain for a (lang, op) pair. A binary absent from the
/// host is not an error, the binding is simply omitted.
pub fn toolchains_for(lang: Lang, op: Op, resolve: &Resolver) -> Vec<Toolchain> {
  let mut found = Vec::new();

  for family in families(lang) {
    let Some(args) = family.args_for(op) else {
      continue;
    };

    for name in family.candidate_names() {
      let Some(bin) = resolve(&name) else {
        continue;
      };

      let version = version_of(&bin, family.version_args);
      found.push(Toolchain {
        lang,
        op,
        bin,
        version,
        args,
      });
    }
  }

  found
}

/// First line of the compiler's version banner. Families disagree on the flag
/// and on which stream the banner goes to (javac historically used stderr);
/// any failure degrades to [`UNKNOWN_VERSION`] rather than aborting.
fn version_of(bin: &Path, version_args: &[&str]) -> String {
  let Ok(Some(output)) = Command::new(bin).args(version_args).timed_output(VERSION_TIMEOUT) else {
    return UNKNOWN_VERSION.to_string();
  };

  let banner = if output.stdout.trim().is_empty() {
    output.stderr
  } else {
    output.stdout
  };

  match banner.first_line() {
    "" => UNKNOWN_VERSION.to_string(),
    line => line.to_string(),
  }
}

/// Default resolver: a plain `$PATH` scan.
pub fn resolve_in_path(name: &str) -> Option<PathBuf> {
  let path = env::var_os("PATH")?;

  env::split_paths(&path).map(|dir| dir.join(name)).find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;

  fs::metadata(path)
    .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}
