use std::{
  fs::File,
  io::{self, Write},
  path::Path,
  sync::Mutex,
};

use anyhow::{Context, Result};
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Installs the global subscriber. Everything at DEBUG and above is persisted
/// to `log`; the terminal only sees warnings, and only with `print_errors`.
pub fn init_logging(log: &Path, print_errors: bool) -> Result<()> {
  let file = File::create(log).with_context(|| format!("create {log:?}"))?;

  let persisted = fmt::layer()
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .with_filter(LevelFilter::DEBUG);

  let terminal = fmt::layer()
    .with_writer(io::stderr)
    .with_filter(if print_errors { LevelFilter::WARN } else { LevelFilter::OFF });

  tracing_subscriber::registry()
    .with(persisted)
    .with(terminal)
    .try_init()
    .context("init subscriber")
}

/// Progress output, printed to stdout and mirrored to a file.
pub struct Console {
  mirror: File,
}

impl Console {
  pub fn create(path: &Path) -> Result<Self> {
    let mirror = File::create(path).with_context(|| format!("create {path:?}"))?;

    Ok(Self { mirror })
  }

  pub fn println(&mut self, line: &str) -> Result<()> {
    println!("{line}");
    writeln!(self.mirror, "{line}").context("write")?;
    self.mirror.flush().context("flush")
  }
}
