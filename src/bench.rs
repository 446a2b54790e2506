use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::{
  cancel::{is_interrupted, Cancel, Interrupted},
  format,
  output::Console,
  plot,
  run::{self, Executor, Group, Platform, Runner, Toolchain},
  score::{extract_micros, score},
  stats::{Results, Sample, Stats},
};

/// What to sweep, and where to put the artifacts.
pub struct Config {
  pub benchmarks: Vec<String>,
  pub platforms: Vec<Platform>,
  pub iterations: usize,
  pub output_dir: PathBuf,
  /// Render an svg chart per benchmark with gnuplot.
  pub plot: bool,
}

pub struct Bench {
  config: Config,
  toolchain: Toolchain,
  executor: Executor,
  console: Console,
  groups: Vec<Group>,
  /// Width runner names are padded to in progress lines.
  name_width: usize,
  /// Statistics collected for each benchmark.
  pub results: Results,
}

/// Runs `stdout_of` exactly `iterations` times, scoring each output. Failed
/// invocations and outputs without a timing are NaN; only cancellation stops
/// the loop early, and then no sample is produced.
pub fn collect<F>(iterations: usize, cancel: &Cancel, mut stdout_of: F) -> Result<Sample, Interrupted>
where
  F: FnMut() -> Result<String>,
{
  let mut sample = Vec::with_capacity(iterations);

  for i in 0..iterations {
    cancel.check()?;

    let entry = match stdout_of() {
      Ok(stdout) => score(extract_micros(&stdout)),
      Err(err) if is_interrupted(&err) => return Err(Interrupted),
      Err(err) => {
        tracing::warn!("iteration {i}: {err:?}");
        f64::NAN
      }
    };

    sample.push(entry);
  }

  cancel.check()?;

  Ok(sample)
}

impl Bench {
  pub fn new(config: Config, toolchain: Toolchain, executor: Executor, console: Console) -> Self {
    let groups = run::groups(&config.platforms);
    let name_width = groups
      .iter()
      .flat_map(|group| group.runners)
      .map(|runner| runner.name().len())
      .max()
      .unwrap_or(0);

    Self {
      config,
      toolchain,
      executor,
      console,
      groups,
      name_width,
      results: Results::default(),
    }
  }

  /// Sweeps every benchmark. An interrupt ends the sweep early but is not an
  /// error.
  pub fn bench(&mut self) -> Result<()> {
    for benchmark in self.config.benchmarks.clone() {
      match self.bench_one(&benchmark) {
        Ok(()) => {}
        Err(err) if is_interrupted(&err) => {
          tracing::info!("interrupted during {benchmark}");
          return Ok(());
        }
        Err(err) => return Err(err).with_context(|| format!("bench {benchmark}")),
      }
    }

    Ok(())
  }

  fn bench_one(&mut self, benchmark: &str) -> Result<()> {
    self.console.println(&format!("Running {benchmark} ..."))?;

    for group in self.groups.clone() {
      if let Err(err) = group.setup.run(&self.toolchain, benchmark, &self.executor) {
        if is_interrupted(&err) {
          return Err(err);
        }
        self.executor.cancel.check()?;

        for &runner in group.runners {
          self.fail(benchmark, runner)?;
        }

        tracing::error!("{benchmark}: setup {} failed: {err:?}", group.setup);
        continue;
      }

      for &runner in group.runners {
        self.measure(benchmark, runner)?;
      }
    }

    self.report(benchmark)?;

    Ok(())
  }

  fn measure(&mut self, benchmark: &str, runner: Runner) -> Result<()> {
    let sample = collect(self.config.iterations, &self.executor.cancel, || {
      self.executor.stdout_of(&self.toolchain, runner, benchmark)
    })?;
    tracing::debug!("{benchmark} {}: {sample:?}", runner.name());

    let stats = Stats::reduce(runner.name(), &sample);
    self.console.println(&format::progress_line(&stats, self.name_width))?;
    self.results.push(benchmark, stats);

    Ok(())
  }

  fn fail(&mut self, benchmark: &str, runner: Runner) -> Result<()> {
    self.results.push(benchmark, Stats::failed(runner.name()));
    self.console.println(&format::failed_line(runner.name(), self.name_width))
  }

  /// Writes the benchmark's artifacts. Failures are logged, and only an
  /// interrupt is raised.
  fn report(&self, benchmark: &str) -> Result<(), Interrupted> {
    let results = self.results.get(benchmark);

    absorb(
      &format!("{benchmark}: csv"),
      plot::write_csv(benchmark, results, &self.config.output_dir),
    )?;

    if self.config.plot {
      absorb(
        &format!("{benchmark}: plot"),
        plot::plot(benchmark, results, &self.config.output_dir, &self.executor),
      )?;
    }

    Ok(())
  }
}

/// Logs a failed `step`, unless it failed because the sweep was interrupted.
fn absorb<T>(step: &str, result: Result<T>) -> Result<(), Interrupted> {
  match result {
    Ok(_) => Ok(()),
    Err(err) if is_interrupted(&err) => Err(Interrupted),
    Err(err) => {
      tracing::error!("{step} failed: {err:?}");
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;

  /// Replays `outputs` in order, one per invocation.
  fn replay<'a>(outputs: &'a [Result<&'a str, &'a str>]) -> impl FnMut() -> Result<String> + 'a {
    let mut outputs = outputs.iter();
    move || match outputs.next() {
      Some(Ok(stdout)) => Ok(stdout.to_string()),
      Some(Err(err)) => Err(anyhow::anyhow!("{err}")),
      None => panic!("invoked too many times"),
    }
  }

  fn bench(dir: &std::path::Path, cancel: Cancel) -> Bench {
    let missing = std::path::PathBuf::from("/nonexistent/benchmarker-tool");
    let toolchain = Toolchain {
      defrac_benchmarks: dir.to_path_buf(),
      ton80_benchmarks: dir.to_path_buf(),
      defrac: missing.clone(),
      java: missing.clone(),
      dart: missing.clone(),
      dart2js: missing.clone(),
      d8: missing.clone(),
      js: missing,
    };
    let config = Config {
      benchmarks: vec!["Richards".to_string(), "Havlak".to_string()],
      platforms: vec![Platform::Jvm],
      iterations: 2,
      output_dir: dir.to_path_buf(),
      plot: false,
    };
    let console = Console::create(&dir.join("stdout.txt")).unwrap();

    Bench::new(config, toolchain, Executor::new(cancel, None), console)
  }

  #[test]
  fn setup_failure_does_not_stop_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let mut bench = bench(dir.path(), Cancel::new());
    bench.bench().unwrap();

    for benchmark in ["Richards", "Havlak"] {
      let results = bench.results.get(benchmark);
      assert_eq!(results.len(), 6);
      assert!(results.iter().all(Stats::is_failed));
    }
  }

  #[test]
  fn interrupt_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = Cancel::new();
    cancel.cancel();

    let mut bench = bench(dir.path(), cancel);
    bench.bench().unwrap();

    assert!(bench.results.get("Richards").is_empty());
    assert!(!dir.path().join("Richards.csv").exists());
  }

  #[test]
  fn absorb_passes_interrupts_through() {
    assert!(absorb("Richards: plot", Err::<(), _>(anyhow::anyhow!("gnuplot missing"))).is_ok());
    assert!(absorb("Richards: plot", Err::<(), _>(Interrupted).context("gnuplot")).is_err());
    assert!(absorb("Richards: csv", Ok(())).is_ok());
  }

  #[test]
  fn undefined_entries_are_kept() {
    let outputs = [Ok("10 us"), Ok("20 us"), Ok("no timing here")];
    let sample = collect(3, &Cancel::new(), replay(&outputs)).unwrap();

    assert_eq!(sample[..2], [100_000.0, 50_000.0]);
    assert!(sample[2].is_nan());

    let stats = Stats::reduce("dart", &sample);
    assert_eq!(stats.best, 100_000.0);
    assert!(stats.mean.is_nan());
    assert!(stats.error.is_nan());
  }

  #[test]
  fn failed_invocation_is_nan_and_loop_continues() {
    let outputs = [Err("exited with non-zero status 1"), Ok("Richards: 500000 us")];
    let sample = collect(2, &Cancel::new(), replay(&outputs)).unwrap();

    assert!(sample[0].is_nan());
    assert_eq!(sample[1], 2.0);
  }

  #[test]
  fn invokes_exactly_iterations_times() {
    let calls = Cell::new(0);
    let sample = collect(10, &Cancel::new(), || {
      calls.set(calls.get() + 1);
      Ok("1000 us".to_string())
    })
    .unwrap();

    assert_eq!(calls.get(), 10);
    assert_eq!(sample, vec![1000.0; 10]);
  }

  #[test]
  fn interrupted_invocation_abandons_sample() {
    let calls = Cell::new(0);
    let result = collect(10, &Cancel::new(), || {
      calls.set(calls.get() + 1);
      if calls.get() == 3 {
        return Err(Interrupted).context("wait");
      }
      Ok("1 us".to_string())
    });

    assert!(result.is_err());
    assert_eq!(calls.get(), 3);
  }

  #[test]
  fn cancel_between_iterations() {
    let cancel = Cancel::new();
    let calls = Cell::new(0);
    let result = collect(10, &cancel, || {
      calls.set(calls.get() + 1);
      cancel.cancel();
      Ok("1 us".to_string())
    });

    assert!(result.is_err());
    assert_eq!(calls.get(), 1);
  }
}
