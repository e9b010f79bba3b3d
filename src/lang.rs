use std::fmt;

use clap::ValueEnum;

/// A benchmarked target language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Lang {
  C,
  #[value(name = "c++")]
  Cpp,
  D,
  Rust,
  Go,
  Zig,
  Java,
  #[value(name = "ocaml")]
  OCaml,
  /// No generator rules exist yet; requesting it exercises the
  /// unsupported-language path.
  V,
}

/// Whether a generated program exercises the language's generic/template
/// instantiation facility, or uses concrete types throughout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenMode {
  Untemplated,
  Templated,
}

/// What the compiler is asked to do with the generated program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Op {
  /// Syntax/semantic validation only, no artifact.
  Check,
  /// Compile to an object file, no linking.
  Build,
}

impl Lang {
  /// Filename-safe language tag, used in generated file names.
  pub fn tag(&self) -> &'static str {
    match self {
      Lang::C => "c",
      Lang::Cpp => "cpp",
      Lang::D => "d",
      Lang::Rust => "rust",
      Lang::Go => "go",
      Lang::Zig => "zig",
      Lang::Java => "java",
      Lang::OCaml => "ocaml",
      Lang::V => "v",
    }
  }

  /// Source file extension, without the leading dot.
  pub fn extension(&self) -> &'static str {
    match self {
      Lang::C => "c",
      Lang::Cpp => "cpp",
      Lang::D => "d",
      Lang::Rust => "rs",
      Lang::Go => "go",
      Lang::Zig => "zig",
      Lang::Java => "java",
      Lang::OCaml => "ml",
      Lang::V => "v",
    }
  }

  /// The native 64-bit numeric type generated programs are written in.
  pub fn numeric_type(&self) -> &'static str {
    match self {
      Lang::C | Lang::Cpp => "int64_t",
      Lang::D => "long",
      Lang::Rust => "i64",
      Lang::Go => "int64",
      Lang::Zig => "i64",
      Lang::Java => "long",
      Lang::OCaml => "float",
      Lang::V => "i64",
    }
  }

  /// Languages for which a templated variant of the program is generated.
  pub fn has_generics(&self) -> bool {
    matches!(self, Lang::Cpp | Lang::D | Lang::Rust | Lang::Zig)
  }

  /// The generic modes a language is generated and benchmarked in.
  pub fn gen_modes(&self) -> &'static [GenMode] {
    if self.has_generics() {
      &[GenMode::Untemplated, GenMode::Templated]
    } else {
      &[GenMode::Untemplated]
    }
  }
}

impl fmt::Display for Lang {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Lang::C => "c",
      Lang::Cpp => "c++",
      Lang::D => "d",
      Lang::Rust => "rust",
      Lang::Go => "go",
      Lang::Zig => "zig",
      Lang::Java => "java",
      Lang::OCaml => "ocaml",
      Lang::V => "v",
    };

    write!(f, "{name}")
  }
}

impl fmt::Display for GenMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GenMode::Untemplated => write!(f, "untemplated"),
      GenMode::Templated => write!(f, "templated"),
    }
  }
}

impl fmt::Display for Op {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Op::Check => write!(f, "check"),
      Op::Build => write!(f, "build"),
    }
  }
}
