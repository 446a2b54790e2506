use std::fmt;

use crate::stats::Stats;

pub const DAT_HEADER: &str = "# Platform\tMean (runs/sec)\tError (±%)\tBest (runs/sec)";
pub const CSV_HEADER: &str = "Platform;Mean (runs/sec); Error (±%);Best (runs/sec)";

impl fmt::Display for Stats {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
      f,
      "{:7.2} runs/sec ({:6.2}±{:3.1}%)",
      self.best, self.mean, self.error
    )
  }
}

/// Right-pads `name` with spaces to `width` characters.
pub fn pad(name: &str, width: usize) -> String {
  format!("{name:<width$}")
}

pub fn progress_line(stats: &Stats, width: usize) -> String {
  format!("  - {} : {stats}", pad(&stats.run, width))
}

pub fn failed_line(run: &str, width: usize) -> String {
  format!("  - {} : <compile failed>", pad(run, width))
}

fn row(stats: &Stats, sep: char) -> String {
  if stats.is_failed() {
    return format!("{run}{sep}0{sep}0{sep}0", run = stats.run);
  }

  format!(
    "{run}{sep}{mean}{sep}{error}{sep}{best}",
    run = stats.run,
    mean = stats.mean,
    error = stats.error,
    best = stats.best,
  )
}

/// A gnuplot data row.
pub fn dat_row(stats: &Stats) -> String {
  row(stats, '\t')
}

pub fn csv_row(stats: &Stats) -> String {
  row(stats, ';')
}
