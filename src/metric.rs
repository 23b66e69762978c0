use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn fb1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // conlleval pads the score to six columns, so 100.00 has one space and the rest two
    PATTERN.get_or_init(|| Regex::new(r"FB1:\s+(\d+\.\d+)").expect("valid FB1 pattern"))
}

/// The first `FB1:` score in a scorer report.
pub fn parse_fb1(report: &str) -> Result<f64> {
    for line in report.lines() {
        if let Some(caps) = fb1_pattern().captures(line) {
            return caps[1]
                .parse()
                .map_err(|e| Error::ScoringUnavailable(format!("bad FB1 value {:?}: {e}", &caps[1])));
        }
    }
    Err(Error::MetricNotFound)
}

/// Fails with [`Error::ThresholdNotMet`] when `observed < threshold`.
pub fn check_threshold(scenario: &str, threshold: f64, observed: f64) -> Result<()> {
    if observed >= threshold {
        Ok(())
    } else {
        Err(Error::ThresholdNotMet {
            scenario: scenario.to_string(),
            threshold,
            observed,
        })
    }
}
