use std::{
  fmt::{self, Write},
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::lang::{GenMode, Lang};

/// Abstract shape of a generated program, independent of target language:
/// `fns` independent call chains, each a stack of `depth` unary functions.
/// Height 0 returns `x + chain`, height h > 0 returns
/// `x + chain[h - 1](x) + chain`. The driver sums each chain's top-most
/// function applied to the chain's index.
#[derive(Clone, Copy, Debug)]
pub struct CallChainSpec {
  pub fns: usize,
  pub depth: usize,
}

impl CallChainSpec {
  pub fn new(fns: usize, depth: usize) -> Self {
    Self { fns, depth }
  }

  /// Name of the function at `height` of chain `chain`, shared by every
  /// language rendering.
  fn name(&self, chain: usize, height: usize) -> String {
    format!("f{chain}_{height}")
  }

  /// Name of the top-most function of chain `chain`, the one the driver calls.
  fn top(&self, chain: usize) -> String {
    self.name(chain, self.depth - 1)
  }
}

/// A rendered source file on disk, identified by (lang, gen_mode). Written
/// once per run before any measurement, immutable afterwards.
#[derive(Debug)]
pub struct GeneratedProgram {
  pub lang: Lang,
  pub gen_mode: GenMode,
  pub numeric_type: &'static str,
  pub fns: usize,
  pub depth: usize,
  pub path: PathBuf,
}

/// The generator has no rendering rules for the requested language. Fatal to
/// that language's generation only, never to the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedLang(pub Lang);

impl fmt::Display for UnsupportedLang {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "no generator rules for language {:?}", self.0)
  }
}

impl std::error::Error for UnsupportedLang {}

/// Per-language surface syntax. Renderings of the same `CallChainSpec` must
/// agree on shape: exactly `fns * depth` function definitions and exactly
/// `fns` call sites in the driver, with the same call-nesting depth.
trait Render {
  fn prefix(&self, out: &mut String, mode: GenMode) -> fmt::Result;
  fn function(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result;
  fn driver(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec) -> fmt::Result;
  fn postfix(&self, out: &mut String, mode: GenMode) -> fmt::Result;
}

fn renderer(lang: Lang) -> Option<&'static dyn Render> {
  match lang {
    Lang::C => Some(&CSyntax),
    Lang::Cpp => Some(&CppSyntax),
    Lang::D => Some(&DSyntax),
    Lang::Rust => Some(&RustSyntax),
    Lang::Go => Some(&GoSyntax),
    Lang::Zig => Some(&ZigSyntax),
    Lang::Java => Some(&JavaSyntax),
    Lang::OCaml => Some(&OCamlSyntax),
    Lang::V => None,
  }
}

/// Renders the full source text for one (lang, mode) pair. Deterministic:
/// identical inputs always produce byte-identical output.
pub fn render(lang: Lang, mode: GenMode, spec: &CallChainSpec) -> Result<String> {
  let syntax = renderer(lang).ok_or(UnsupportedLang(lang))?;

  let mut out = String::new();

  syntax.prefix(&mut out, mode)?;
  for chain in 0..spec.fns {
    for height in 0..spec.depth {
      syntax.function(&mut out, mode, spec, chain, height)?;
    }
  }
  syntax.driver(&mut out, mode, spec)?;
  syntax.postfix(&mut out, mode)?;

  Ok(out)
}

/// Renders and writes the program for one (lang, mode) pair at a
/// deterministic path under `out_dir`. Nothing is written for an unsupported
/// language.
pub fn generate(lang: Lang, mode: GenMode, fns: usize, depth: usize, out_dir: &Path) -> Result<GeneratedProgram> {
  let spec = CallChainSpec::new(fns, depth);
  let source = render(lang, mode, &spec)?;

  let path = out_dir.join(format!("chains_{}_{mode}.{}", lang.tag(), lang.extension()));
  fs::write(&path, source).with_context(|| format!("write {path:?}"))?;

  Ok(GeneratedProgram {
    lang,
    gen_mode: mode,
    numeric_type: lang.numeric_type(),
    fns,
    depth,
    path,
  })
}

struct CSyntax;

impl Render for CSyntax {
  fn prefix(&self, out: &mut String, _mode: GenMode) -> fmt::Result {
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out)
  }

  fn function(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    if height == 0 {
      writeln!(out, "static int64_t {name}(int64_t x) {{ return x + {chain}; }}")
    } else {
      let prev = spec.name(chain, height - 1);
      writeln!(out, "static int64_t {name}(int64_t x) {{ return x + {prev}(x) + {chain}; }}")
    }
  }

  fn driver(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "int main(void) {{")?;
    writeln!(out, "  int64_t sum = 0;")?;
    for chain in 0..spec.fns {
      writeln!(out, "  sum += {top}({chain});", top = spec.top(chain))?;
    }
    writeln!(out, "  return (int)(sum & 0xff);")?;
    writeln!(out, "}}")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}

struct CppSyntax;

impl Render for CppSyntax {
  fn prefix(&self, out: &mut String, _mode: GenMode) -> fmt::Result {
    writeln!(out, "#include <cstdint>")?;
    writeln!(out)
  }

  fn function(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    match mode {
      GenMode::Untemplated => {
        if height == 0 {
          writeln!(out, "static int64_t {name}(int64_t x) {{ return x + {chain}; }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "static int64_t {name}(int64_t x) {{ return x + {prev}(x) + {chain}; }}")
        }
      }
      GenMode::Templated => {
        writeln!(out, "template <typename T>")?;
        if height == 0 {
          writeln!(out, "static T {name}(T x) {{ return x + {chain}; }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "static T {name}(T x) {{ return x + {prev}<T>(x) + {chain}; }}")
        }
      }
    }
  }

  fn driver(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "int main() {{")?;
    writeln!(out, "  int64_t sum = 0;")?;
    for chain in 0..spec.fns {
      let top = spec.top(chain);
      match mode {
        GenMode::Untemplated => writeln!(out, "  sum += {top}({chain});")?,
        GenMode::Templated => writeln!(out, "  sum += {top}<int64_t>({chain});")?,
      }
    }
    writeln!(out, "  return static_cast<int>(sum & 0xff);")?;
    writeln!(out, "}}")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}

struct DSyntax;

impl Render for DSyntax {
  fn prefix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }

  fn function(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    match mode {
      GenMode::Untemplated => {
        if height == 0 {
          writeln!(out, "long {name}(long x) {{ return x + {chain}; }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "long {name}(long x) {{ return x + {prev}(x) + {chain}; }}")
        }
      }
      // dmd could infer the instantiation, but the explicit `!(T)` form keeps
      // instantiation work at every call site.
      GenMode::Templated => {
        if height == 0 {
          writeln!(out, "T {name}(T)(T x) {{ return x + {chain}; }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "T {name}(T)(T x) {{ return x + {prev}!(T)(x) + {chain}; }}")
        }
      }
    }
  }

  fn driver(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "int main() {{")?;
    writeln!(out, "  long sum = 0;")?;
    for chain in 0..spec.fns {
      let top = spec.top(chain);
      match mode {
        GenMode::Untemplated => writeln!(out, "  sum += {top}({chain});")?,
        GenMode::Templated => writeln!(out, "  sum += {top}!(long)({chain});")?,
      }
    }
    writeln!(out, "  return cast(int)(sum & 0xff);")?;
    writeln!(out, "}}")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}

struct RustSyntax;

const RUST_BOUND: &str = "Copy + From<i64> + std::ops::Add<Output = T>";

impl Render for RustSyntax {
  fn prefix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }

  fn function(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    match mode {
      GenMode::Untemplated => {
        if height == 0 {
          writeln!(out, "fn {name}(x: i64) -> i64 {{ x + {chain} }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "fn {name}(x: i64) -> i64 {{ x + {prev}(x) + {chain} }}")
        }
      }
      GenMode::Templated => {
        if height == 0 {
          writeln!(out, "fn {name}<T: {RUST_BOUND}>(x: T) -> T {{ x + T::from({chain}i64) }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(
            out,
            "fn {name}<T: {RUST_BOUND}>(x: T) -> T {{ x + {prev}::<T>(x) + T::from({chain}i64) }}"
          )
        }
      }
    }
  }

  fn driver(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "fn main() {{")?;
    writeln!(out, "  let mut sum: i64 = 0;")?;
    for chain in 0..spec.fns {
      let top = spec.top(chain);
      match mode {
        GenMode::Untemplated => writeln!(out, "  sum += {top}({chain});")?,
        GenMode::Templated => writeln!(out, "  sum += {top}::<i64>({chain});")?,
      }
    }
    writeln!(out, "  std::process::exit((sum & 0xff) as i32);")?;
    writeln!(out, "}}")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}

struct GoSyntax;

impl Render for GoSyntax {
  fn prefix(&self, out: &mut String, _mode: GenMode) -> fmt::Result {
    writeln!(out, "package main")?;
    writeln!(out)?;
    writeln!(out, "import \"os\"")?;
    writeln!(out)
  }

  fn function(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    if height == 0 {
      writeln!(out, "func {name}(x int64) int64 {{ return x + {chain} }}")
    } else {
      let prev = spec.name(chain, height - 1);
      writeln!(out, "func {name}(x int64) int64 {{ return x + {prev}(x) + {chain} }}")
    }
  }

  fn driver(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "func main() {{")?;
    writeln!(out, "  var sum int64 = 0;")?;
    for chain in 0..spec.fns {
      writeln!(out, "  sum += {top}({chain});", top = spec.top(chain))?;
    }
    writeln!(out, "  os.Exit(int(sum & 0xff));")?;
    writeln!(out, "}}")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}

struct ZigSyntax;

impl Render for ZigSyntax {
  fn prefix(&self, out: &mut String, _mode: GenMode) -> fmt::Result {
    writeln!(out, "const std = @import(\"std\");")?;
    writeln!(out)
  }

  fn function(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    match mode {
      GenMode::Untemplated => {
        if height == 0 {
          writeln!(out, "fn {name}(x: i64) i64 {{ return x + {chain}; }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "fn {name}(x: i64) i64 {{ return x + {prev}(x) + {chain}; }}")
        }
      }
      // `comptime T: type` parameters make the instantiation explicit at
      // every call site, there is no inference to fall back on.
      GenMode::Templated => {
        if height == 0 {
          writeln!(out, "fn {name}(comptime T: type, x: T) T {{ return x + {chain}; }}")
        } else {
          let prev = spec.name(chain, height - 1);
          writeln!(out, "fn {name}(comptime T: type, x: T) T {{ return x + {prev}(T, x) + {chain}; }}")
        }
      }
    }
  }

  fn driver(&self, out: &mut String, mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "pub fn main() void {{")?;
    writeln!(out, "  var sum: i64 = 0;")?;
    for chain in 0..spec.fns {
      let top = spec.top(chain);
      match mode {
        GenMode::Untemplated => writeln!(out, "  sum += {top}({chain});")?,
        GenMode::Templated => writeln!(out, "  sum += {top}(i64, {chain});")?,
      }
    }
    writeln!(out, "  std.process.exit(@intCast(sum & 0xff));")?;
    writeln!(out, "}}")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}

struct JavaSyntax;

impl Render for JavaSyntax {
  fn prefix(&self, out: &mut String, _mode: GenMode) -> fmt::Result {
    writeln!(out, "class Chains {{")
  }

  fn function(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    if height == 0 {
      writeln!(out, "  static long {name}(long x) {{ return x + {chain}; }}")
    } else {
      let prev = spec.name(chain, height - 1);
      writeln!(out, "  static long {name}(long x) {{ return x + {prev}(x) + {chain}; }}")
    }
  }

  fn driver(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "  public static void main(String[] args) {{")?;
    writeln!(out, "    long sum = 0;")?;
    for chain in 0..spec.fns {
      writeln!(out, "    sum += {top}({chain});", top = spec.top(chain))?;
    }
    writeln!(out, "    System.exit((int)(sum & 0xff));")?;
    writeln!(out, "  }}")
  }

  fn postfix(&self, out: &mut String, _mode: GenMode) -> fmt::Result {
    writeln!(out, "}}")
  }
}

struct OCamlSyntax;

impl Render for OCamlSyntax {
  fn prefix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }

  fn function(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec, chain: usize, height: usize) -> fmt::Result {
    let name = spec.name(chain, height);

    if height == 0 {
      writeln!(out, "let {name} (x : float) : float = x +. {chain}.0")
    } else {
      let prev = spec.name(chain, height - 1);
      writeln!(out, "let {name} (x : float) : float = x +. {prev} x +. {chain}.0")
    }
  }

  fn driver(&self, out: &mut String, _mode: GenMode, spec: &CallChainSpec) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "let () =")?;
    writeln!(out, "  let sum = ref 0.0 in")?;
    for chain in 0..spec.fns {
      writeln!(out, "  sum := !sum +. {top} {chain}.0;", top = spec.top(chain))?;
    }
    writeln!(out, "  exit (int_of_float !sum land 255)")
  }

  fn postfix(&self, _out: &mut String, _mode: GenMode) -> fmt::Result {
    Ok(())
  }
}
