use std::{
  fs,
  io::Write,
  path::{Path, PathBuf},
  process::Command,
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::{
  ext::NamedTempFileExt,
  format::{self, CSV_HEADER, DAT_HEADER},
  run::Executor,
  stats::Stats,
};

/// Results ordered by runner name, the order every artifact uses.
fn sorted(results: &[Stats]) -> Vec<&Stats> {
  let mut sorted: Vec<_> = results.iter().collect();
  sorted.sort_by(|a, b| a.run.cmp(&b.run));

  sorted
}

fn table(header: &str, rows: impl Iterator<Item = String>) -> String {
  std::iter::once(header.to_string())
    .chain(rows)
    .map(|row| row + "\n")
    .collect()
}

/// Writes `<dir>/<benchmark>.csv`, replacing any previous run's file.
pub fn write_csv(benchmark: &str, results: &[Stats], dir: &Path) -> Result<PathBuf> {
  let path = dir.join(format!("{benchmark}.csv"));
  let csv = table(CSV_HEADER, sorted(results).into_iter().map(format::csv_row));

  fs::write(&path, csv).with_context(|| format!("write {path:?}"))?;

  Ok(path)
}

fn script(benchmark: &str, svg: &Path, dat: &Path) -> String {
  [
    format!("set output \"{}\"", svg.display()),
    format!("set title \"{benchmark}\""),
    "set terminal svg size 640,480 fname 'Verdana' fsize 10".to_string(),
    "set ylabel \"Score (runs/sec)\"".to_string(),
    "set grid ytics lc rgb \"#dddddd\" lw 1 lt 0".to_string(),
    "set grid xtics lc rgb \"#dddddd\" lw 1 lt 0".to_string(),
    "set key noenhanced".to_string(),
    "set tic scale 0".to_string(),
    "set xtics nomirror rotate by -45 font \",8\"".to_string(),
    "set style data histograms".to_string(),
    "set style histogram".to_string(),
    "set style fill solid 1.0 border 0".to_string(),
    "set boxwidth 0.9".to_string(),
    format!(
      "plot \"{}\" using 2:xtic(1) notitle linecolor rgb \"#15C7E0\"",
      dat.display()
    ),
  ]
  .iter()
  .map(|command| format!("{command};"))
  .collect()
}

/// Renders `<dir>/<benchmark>.svg` with gnuplot, a bar per runner's mean.
pub fn plot(benchmark: &str, results: &[Stats], dir: &Path, executor: &Executor) -> Result<PathBuf> {
  let svg = std::path::absolute(dir.join(format!("{benchmark}.svg"))).context("absolute svg path")?;
  if svg.exists() {
    fs::remove_file(&svg).with_context(|| format!("remove {svg:?}"))?;
  }

  let mut dat = NamedTempFile::with_affixes(benchmark, ".dat")?;
  let rows = table(DAT_HEADER, sorted(results).into_iter().map(format::dat_row));
  dat.write_all(rows.as_bytes()).context("write dat")?;
  dat.flush().context("flush dat")?;

  executor
    .capture(Command::new("gnuplot").arg("-e").arg(script(benchmark, &svg, dat.path())))
    .context("gnuplot")?;

  Ok(svg)
}
