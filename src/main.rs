mod bench;
mod cancel;
mod ext;
mod format;
mod output;
mod plot;
mod run;
mod score;
mod stats;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

use self::{
  bench::{Bench, Config},
  cancel::Cancel,
  output::Console,
  run::{Executor, Platform, Toolchain},
  stats::DEFAULT_ITERATIONS,
};

#[derive(Parser)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Measures every benchmark on every runner.
  Bench(BenchArgs),
}

#[derive(ClapArgs, Debug)]
struct BenchArgs {
  /// Path to the defrac benchmark suite.
  #[arg(long, default_value = ".")]
  defrac_benchmarks: PathBuf,
  /// Path to the ton80 benchmark suite.
  #[arg(long, default_value = ".")]
  ton80_benchmarks: PathBuf,
  /// Path to V8's d8 shell.
  #[arg(long, default_value = "d8")]
  d8: PathBuf,
  /// Path to dart.
  #[arg(long, default_value = "dart")]
  dart: PathBuf,
  /// Path to dart2js.
  #[arg(long, default_value = "dart2js")]
  dart2js: PathBuf,
  /// Path to defrac.
  #[arg(long, default_value = "defrac")]
  defrac: PathBuf,
  /// Path to java.
  #[arg(long, default_value = "java")]
  java: PathBuf,
  /// Path to SpiderMonkey's js shell.
  #[arg(long, default_value = "js")]
  js: PathBuf,
  /// Benchmarks to run.
  #[arg(short, long, default_values = ["DeltaBlue", "FluidMotion", "Richards", "Tracer", "Havlak"])]
  benchmarks: Vec<String>,
  /// defrac platforms to compile for. Defaults to every platform the host
  /// supports.
  #[arg(short, long, value_enum)]
  platforms: Vec<Platform>,
  /// Runs per runner per benchmark.
  #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS as u32, value_parser = clap::value_parser!(u32).range(1..))]
  iterations: u32,
  /// Seconds after which a single run is killed and counted as failed.
  #[arg(long)]
  timeout: Option<u64>,
  /// Directory for logs, csv files and charts.
  #[arg(short, long, default_value = ".")]
  output_dir: PathBuf,
  /// Skip rendering charts with gnuplot.
  #[arg(long)]
  no_plot: bool,
  /// Also print absorbed errors to stderr.
  #[arg(long)]
  print_errors: bool,
}

fn main() -> Result<()> {
  match Args::parse().command {
    Command::Bench(args) => {
      fs::create_dir_all(&args.output_dir).with_context(|| format!("create {:?}", args.output_dir))?;

      output::init_logging(&args.output_dir.join("stderr.txt"), args.print_errors).context("logging")?;
      let console = Console::create(&args.output_dir.join("stdout.txt")).context("console")?;

      let cancel = Cancel::new();
      cancel.install_handler()?;

      let toolchain = Toolchain {
        defrac_benchmarks: args.defrac_benchmarks,
        ton80_benchmarks: args.ton80_benchmarks,
        defrac: args.defrac,
        java: args.java,
        dart: args.dart,
        dart2js: args.dart2js,
        d8: args.d8,
        js: args.js,
      };

      let config = Config {
        benchmarks: args.benchmarks,
        platforms: if args.platforms.is_empty() {
          Platform::defaults()
        } else {
          args.platforms
        },
        iterations: args.iterations as usize,
        output_dir: args.output_dir,
        plot: cfg!(target_os = "linux") && !args.no_plot,
      };

      let executor = Executor::new(cancel, args.timeout.map(Duration::from_secs));

      let mut bench = Bench::new(config, toolchain, executor, console);
      bench.bench().context("bench")?;
    }
  }

  Ok(())
}
