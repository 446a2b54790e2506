use once_cell::sync::Lazy;
use regex::Regex;

/// Timings are normalized to one second when converted to a score.
pub const MICROS_PER_SECOND: f64 = 1.0e6;

/// The timing token every benchmark prints, e.g. `Richards: 1234.56 us`.
static TIMING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?) us").expect("timing regex"));

/// Returns the duration, in microseconds, of the first timing token in
/// `stdout`. Later tokens are ignored.
pub fn extract_micros(stdout: &str) -> Option<f64> {
  TIMING.captures(stdout)?.get(1)?.as_str().parse().ok()
}

/// Converts a duration into runs per second. A missing duration becomes NaN,
/// which is kept in the sample as is.
pub fn score(micros: Option<f64>) -> f64 {
  micros.map_or(f64::NAN, |micros| MICROS_PER_SECOND / micros)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_match_only() {
    assert_eq!(extract_micros("Richards: 1234.56 us\nmore text 999 us"), Some(1234.56));
  }

  #[test]
  fn integer_timing() {
    assert_eq!(extract_micros("42 us"), Some(42.0));
  }

  #[test]
  fn no_timing() {
    assert_eq!(extract_micros("no timing here"), None);
    assert_eq!(extract_micros("1234.56 ms"), None);
    assert_eq!(extract_micros("1234.56us"), None);
    assert_eq!(extract_micros(""), None);
  }

  #[test]
  fn dangling_decimal_point() {
    // `12.` has no fractional digits, so only `5` precedes the unit.
    assert_eq!(extract_micros("12. 5 us"), Some(5.0));
  }

  #[test]
  fn score_is_runs_per_second() {
    assert_eq!(score(Some(500_000.0)), 2.0);
    assert_eq!(score(Some(10.0)), 100_000.0);
    assert!(score(None).is_nan());
  }
}
