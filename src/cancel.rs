use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use anyhow::{Context, Result};

/// The sweep was interrupted. This is not a failure of any single run, and
/// must unwind every loop up to the sweep.
#[derive(Debug, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Shared cancellation flag, set once by the interrupt handler and polled by
/// every blocking wait.
#[derive(Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  pub fn check(&self) -> Result<(), Interrupted> {
    if self.is_cancelled() {
      return Err(Interrupted);
    }

    Ok(())
  }

  /// Routes Ctrl-C to this token instead of killing the process.
  pub fn install_handler(&self) -> Result<()> {
    let cancel = self.clone();
    ctrlc::set_handler(move || cancel.cancel()).context("set ctrl-c handler")
  }
}

/// Returns true if `err`, or anything it wraps, is an [`Interrupted`].
pub fn is_interrupted(err: &anyhow::Error) -> bool {
  err.chain().any(|cause| cause.is::<Interrupted>())
}
