use std::{fmt::Write, time::Duration};

use anyhow::Result;

use crate::stats::{ReportRow, Stats};

const COLUMN_PADDING: &str = "  ";

/// Columns counted from the right that hold numbers and get right-aligned.
const NUMERIC_COLUMNS: usize = 2;

fn fmt_duration(duration: Duration) -> String {
  let secs = duration.as_secs_f64();

  if secs >= 1.0 {
    format!("{secs:.2}s")
  } else {
    format!("{ms:.1}ms", ms = secs * 1e3)
  }
}

fn cells(row: &ReportRow) -> Vec<String> {
  vec![
    row.lang.to_string(),
    row.gen_mode.to_string(),
    row.op.to_string(),
    row.bin.clone(),
    row.version.clone(),
    fmt_duration(row.duration),
    row.speedup.to_string(),
  ]
}

/// Renders the comparison table: one row per measured identity, in key order.
pub fn format(stats: &Stats) -> Result<String> {
  let header = vec![
    "language".to_string(),
    "mode".to_string(),
    "op".to_string(),
    "binary".to_string(),
    "version".to_string(),
    "time".to_string(),
    format!("vs {}", stats.reference()),
  ];

  let rows: Vec<Vec<String>> = stats.rows().iter().map(cells).collect();

  let mut widths: Vec<usize> = header.iter().map(String::len).collect();
  for row in &rows {
    for (width, cell) in widths.iter_mut().zip(row) {
      *width = (*width).max(cell.len());
    }
  }

  let render = |row: &[String]| -> String {
    row
      .iter()
      .enumerate()
      .map(|(i, cell)| {
        let width = widths[i];
        if i + NUMERIC_COLUMNS >= widths.len() {
          format!("{cell:>width$}")
        } else {
          format!("{cell:<width$}")
        }
      })
      .collect::<Vec<_>>()
      .join(COLUMN_PADDING)
  };

  let mut table = String::new();

  let header = render(&header);
  writeln!(table, "{header}")?;
  writeln!(table, "{}", "=".repeat(header.len()))?;
  for row in &rows {
    writeln!(table, "{}", render(row))?;
  }

  Ok(table)
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, time::Duration};

  use super::*;
  use crate::{
    lang::{GenMode, Lang, Op},
    stats::{Key, Measurement},
  };

  #[test]
  fn duration_formatting_switches_units() {
    assert_eq!(fmt_duration(Duration::from_millis(82)), "82.0ms");
    assert_eq!(fmt_duration(Duration::from_secs_f64(1.234)), "1.23s");
  }

  #[test]
  fn table_has_one_line_per_measurement_plus_header() {
    let mut stats = Stats::new(Lang::D);

    let record = |stats: &mut Stats, lang, bin: &str, secs| {
      stats.record(
        Key {
          lang,
          gen_mode: GenMode::Untemplated,
          op: Op::Check,
          bin: PathBuf::from(bin),
        },
        Measurement {
          duration: Duration::from_secs_f64(secs),
          version: "v1".to_string(),
        },
      );
    };

    record(&mut stats, Lang::D, "/usr/bin/dmd", 3.0);
    record(&mut stats, Lang::Rust, "/usr/bin/rustc", 1.5);

    let table = format(&stats).expect("format");
    let lines: Vec<_> = table.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("language"));
    assert!(lines[0].ends_with("vs d"));
    assert!(lines[1].chars().all(|ch| ch == '='));
    // dmd orders before rustc; the reference row carries no speedup.
    assert!(lines[2].starts_with("d "));
    assert!(lines[2].ends_with("n/a"));
    assert!(lines[3].starts_with("rust"));
    assert!(lines[3].ends_with("2.00x"));
  }
}
