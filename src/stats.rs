use std::collections::BTreeMap;

/// Number of times each runner is invoked per benchmark.
pub const DEFAULT_ITERATIONS: usize = 10;

/// One score per invocation, in runs per second. Failed invocations are NaN.
pub type Sample = Vec<f64>;

/// Two-tailed 95% critical values of Student's t, indexed by sample size.
/// Sizes 0 and 1 have no interval.
#[rustfmt::skip]
const T_TABLE: [f64; 101] = [
  f64::NAN, f64::NAN, 12.71,
  4.30, 3.18, 2.78, 2.57, 2.45, 2.36, 2.31, 2.26, 2.23, 2.20, 2.18, 2.16,
  2.14, 2.13, 2.12, 2.11, 2.10, 2.09, 2.09, 2.08, 2.07, 2.07, 2.06, 2.06,
  2.06, 2.05, 2.05, 2.04, 2.04, 2.04, 2.04, 2.03, 2.03, 2.03, 2.03, 2.03,
  2.02, 2.02, 2.02, 2.02, 2.02, 2.02, 2.02, 2.01, 2.01, 2.01, 2.01, 2.01,
  2.01, 2.01, 2.01, 2.01, 2.00, 2.00, 2.00, 2.00, 2.00, 2.00, 2.00, 2.00,
  2.00, 2.00, 2.00, 2.00, 2.00, 2.00, 2.00, 1.99, 1.99, 1.99, 1.99, 1.99,
  1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99,
  1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99, 1.99,
  1.99, 1.99,
];

/// Reduced statistics of one runner on one benchmark.
#[derive(Clone, Debug)]
pub struct Stats {
  /// Name of the runner that produced the sample.
  pub run: String,
  /// Highest score, in runs per second.
  pub best: f64,
  /// Mean score, in runs per second.
  pub mean: f64,
  /// Half-width of the 95% confidence interval, as a percentage of `mean`.
  pub error: f64,
}

impl Stats {
  pub fn reduce<S: Into<String>>(run: S, sample: &[f64]) -> Self {
    let best = best(sample);
    let mean = mean(sample);

    let error = match sample.len() {
      0 => f64::NAN,
      1 => 0.0,
      n => {
        let standard_error = standard_deviation(sample, mean) / (n as f64).sqrt();
        (t_distribution(n) * standard_error / mean) * 100.0
      }
    };

    Self {
      run: run.into(),
      best,
      mean,
      error,
    }
  }

  /// Placeholder for a runner that could not be measured at all.
  pub fn failed<S: Into<String>>(run: S) -> Self {
    Self {
      run: run.into(),
      best: f64::NAN,
      mean: f64::NAN,
      error: f64::NAN,
    }
  }

  pub fn is_failed(&self) -> bool {
    self.mean.is_nan()
  }
}

/// Highest defined score. NaN only if every score is NaN.
pub fn best(sample: &[f64]) -> f64 {
  sample.iter().copied().fold(f64::NAN, f64::max)
}

/// NaN if any score is NaN.
pub fn mean(sample: &[f64]) -> f64 {
  sample.iter().sum::<f64>() / sample.len() as f64
}

/// Sample standard deviation, with Bessel's correction.
pub fn standard_deviation(sample: &[f64], mean: f64) -> f64 {
  let delta_squared_sum: f64 = sample.iter().map(|score| (score - mean) * (score - mean)).sum();

  (delta_squared_sum / (sample.len() - 1) as f64).sqrt()
}

pub fn t_distribution(n: usize) -> f64 {
  match n {
    474.. => 1.96,
    160.. => 1.97,
    n if n >= T_TABLE.len() => 1.98,
    n => T_TABLE[n],
  }
}

/// Results of a sweep, per benchmark, in the order they were measured.
#[derive(Default)]
pub struct Results {
  by_benchmark: BTreeMap<String, Vec<Stats>>,
}

impl Results {
  pub fn push(&mut self, benchmark: &str, stats: Stats) {
    self.by_benchmark.entry(benchmark.to_string()).or_default().push(stats);
  }

  pub fn get(&self, benchmark: &str) -> &[Stats] {
    self.by_benchmark.get(benchmark).map(Vec::as_slice).unwrap_or_default()
  }
}
