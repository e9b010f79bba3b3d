use std::{
  collections::{btree_map::Entry, BTreeMap},
  fmt,
  path::PathBuf,
  time::Duration,
};

use crate::{
  ext::PathExt,
  lang::{GenMode, Lang, Op},
};

/// Composite identity of one measurement. A structured key rather than a
/// concatenated string: binary paths may contain any delimiter we could pick.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key {
  pub lang: Lang,
  pub gen_mode: GenMode,
  pub op: Op,
  pub bin: PathBuf,
}

/// What gets recorded for one identity: the minimum duration over the run's
/// repetitions, plus the toolchain's version banner for display.
#[derive(Clone, Debug)]
pub struct Measurement {
  pub duration: Duration,
  pub version: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Speedup {
  /// Reference duration divided by this identity's duration.
  Ratio(f64),
  /// No reference measurement to compare against, or this is the reference
  /// language's own row.
  NotApplicable,
}

impl fmt::Display for Speedup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Speedup::Ratio(ratio) => write!(f, "{ratio:.2}x"),
      Speedup::NotApplicable => write!(f, "n/a"),
    }
  }
}

/// One line of the final report, derived and immutable.
#[derive(Clone, Debug)]
pub struct ReportRow {
  pub lang: Lang,
  pub gen_mode: GenMode,
  pub op: Op,
  /// Home-relative display form of the binary; the identity key keeps the
  /// full path.
  pub bin: String,
  pub version: String,
  pub duration: Duration,
  pub speedup: Speedup,
}

/// Append-only measurement map for one run, plus the reference language all
/// speedups are computed against.
pub struct Stats {
  reference: Lang,
  measurements: BTreeMap<Key, Measurement>,
}

impl Stats {
  pub fn new(reference: Lang) -> Self {
    Self {
      reference,
      measurements: BTreeMap::new(),
    }
  }

  pub fn reference(&self) -> Lang {
    self.reference
  }

  pub fn is_empty(&self) -> bool {
    self.measurements.is_empty()
  }

  /// First write wins; re-measuring an identity within one run is not
  /// supported. Returns whether the measurement was stored.
  pub fn record(&mut self, key: Key, measurement: Measurement) -> bool {
    match self.measurements.entry(key) {
      Entry::Vacant(entry) => {
        entry.insert(measurement);
        true
      }
      Entry::Occupied(_) => false,
    }
  }

  /// Speedup against the reference language's measurement sharing this key's
  /// (gen_mode, op). `NotApplicable` for the reference language's own rows
  /// and when no reference measurement exists for the pair; when several
  /// reference binaries were measured, the fastest one is the denominator.
  pub fn speedup_of(&self, key: &Key) -> Speedup {
    if key.lang == self.reference {
      return Speedup::NotApplicable;
    }

    let reference = self
      .measurements
      .iter()
      .filter(|(other, _)| other.lang == self.reference && other.gen_mode == key.gen_mode && other.op == key.op)
      .map(|(_, measurement)| measurement.duration)
      .min();

    match (reference, self.measurements.get(key)) {
      (Some(reference), Some(this)) => Speedup::Ratio(reference.as_secs_f64() / this.duration.as_secs_f64()),
      _ => Speedup::NotApplicable,
    }
  }

  /// Report rows in key order: language, then mode, then operation, then
  /// binary path.
  pub fn rows(&self) -> Vec<ReportRow> {
    self
      .measurements
      .iter()
      .map(|(key, measurement)| ReportRow {
        lang: key.lang,
        gen_mode: key.gen_mode,
        op: key.op,
        bin: key.bin.home_relative(),
        version: measurement.version.clone(),
        duration: measurement.duration,
        speedup: self.speedup_of(key),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(lang: Lang, gen_mode: GenMode, op: Op, bin: &str) -> Key {
    Key {
      lang,
      gen_mode,
      op,
      bin: PathBuf::from(bin),
    }
  }

  fn measurement(secs: f64) -> Measurement {
    Measurement {
      duration: Duration::from_secs_f64(secs),
      version: "test 1.0".to_string(),
    }
  }

  #[test]
  fn first_write_wins() {
    let mut stats = Stats::new(Lang::D);
    let rustc = key(Lang::Rust, GenMode::Untemplated, Op::Check, "/usr/bin/rustc");

    assert!(stats.record(rustc.clone(), measurement(1.5)));
    assert!(!stats.record(rustc.clone(), measurement(9.0)));

    let rows = stats.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].duration, Duration::from_secs_f64(1.5));
  }

  #[test]
  fn speedup_is_reference_over_this() {
    let mut stats = Stats::new(Lang::D);

    stats.record(key(Lang::D, GenMode::Untemplated, Op::Check, "/usr/bin/dmd"), measurement(3.0));
    let rustc = key(Lang::Rust, GenMode::Untemplated, Op::Check, "/usr/bin/rustc");
    stats.record(rustc.clone(), measurement(1.5));

    assert_eq!(stats.speedup_of(&rustc), Speedup::Ratio(2.0));
  }

  #[test]
  fn reference_rows_are_never_compared_against_themselves() {
    let mut stats = Stats::new(Lang::D);

    let dmd = key(Lang::D, GenMode::Untemplated, Op::Check, "/usr/bin/dmd");
    let ldc = key(Lang::D, GenMode::Untemplated, Op::Check, "/usr/bin/ldc2");
    stats.record(dmd.clone(), measurement(3.0));
    stats.record(ldc.clone(), measurement(2.0));

    assert_eq!(stats.speedup_of(&dmd), Speedup::NotApplicable);
    assert_eq!(stats.speedup_of(&ldc), Speedup::NotApplicable);
  }

  #[test]
  fn missing_reference_measurement_degrades_to_not_applicable() {
    let mut stats = Stats::new(Lang::D);

    // The reference language was benchmarked, but only for a different
    // (mode, op) pair.
    stats.record(key(Lang::D, GenMode::Templated, Op::Build, "/usr/bin/dmd"), measurement(3.0));
    let rustc = key(Lang::Rust, GenMode::Untemplated, Op::Check, "/usr/bin/rustc");
    stats.record(rustc.clone(), measurement(1.5));

    assert_eq!(stats.speedup_of(&rustc), Speedup::NotApplicable);
  }

  #[test]
  fn fastest_reference_binary_is_the_denominator() {
    let mut stats = Stats::new(Lang::D);

    stats.record(key(Lang::D, GenMode::Untemplated, Op::Check, "/usr/bin/dmd"), measurement(4.0));
    stats.record(key(Lang::D, GenMode::Untemplated, Op::Check, "/usr/bin/ldc2"), measurement(2.0));
    let rustc = key(Lang::Rust, GenMode::Untemplated, Op::Check, "/usr/bin/rustc");
    stats.record(rustc.clone(), measurement(1.0));

    assert_eq!(stats.speedup_of(&rustc), Speedup::Ratio(2.0));
  }

  #[test]
  fn rows_are_ordered_and_display_home_relative_paths() {
    let home = std::env::var("HOME").expect("HOME");

    let mut stats = Stats::new(Lang::D);
    stats.record(
      key(Lang::Rust, GenMode::Untemplated, Op::Check, &format!("{home}/.cargo/bin/rustc")),
      measurement(1.0),
    );
    stats.record(key(Lang::C, GenMode::Untemplated, Op::Check, "/usr/bin/gcc-9"), measurement(1.0));

    let rows = stats.rows();
    assert_eq!(rows[0].lang, Lang::C);
    assert_eq!(rows[0].bin, "/usr/bin/gcc-9");
    assert_eq!(rows[1].lang, Lang::Rust);
    assert_eq!(rows[1].bin, "~/.cargo/bin/rustc");
  }

  #[test]
  fn speedup_display() {
    assert_eq!(Speedup::Ratio(2.0).to_string(), "2.00x");
    assert_eq!(Speedup::NotApplicable.to_string(), "n/a");
  }
}
