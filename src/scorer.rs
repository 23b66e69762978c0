use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::{
    error::{Error, Result},
    evaluation::Evaluation,
    process::{describe_failure, run_bounded},
};

/// Script the scoring step runs, relative to the working directory.
pub const EVAL_SCRIPT: &str = "eval_conll_cmd.sh";

/// Turns a `token gold predicted` file into a textual report carrying an
/// `FB1:` line.
pub trait Scorer {
    fn score(&self, input: &Path) -> Result<String>;
}

/// Runs `<work_dir>/eval_conll_cmd.sh <input>` and returns its stdout.
#[derive(Debug, Clone)]
pub struct ScriptScorer {
    script: PathBuf,
    timeout: Duration,
}

impl ScriptScorer {
    pub fn new<P: AsRef<Path>>(work_dir: P, timeout: Duration) -> Self {
        Self { script: work_dir.as_ref().join(EVAL_SCRIPT), timeout }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl Scorer for ScriptScorer {
    fn score(&self, input: &Path) -> Result<String> {
        let unavailable = |detail: String| Error::ScoringUnavailable(format!("{}: {detail}", self.script.display()));
        let mut cmd = Command::new(&self.script);
        cmd.arg(input);
        let captured = run_bounded(&mut cmd, None, self.timeout).map_err(|e| unavailable(e.to_string()))?;
        if !captured.status.success() {
            return Err(unavailable(describe_failure(&captured)));
        }
        Ok(captured.stdout)
    }
}

/// Scores in process, producing conlleval-formatted text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConllEval;

impl Scorer for ConllEval {
    fn score(&self, input: &Path) -> Result<String> {
        let mut evaluation = Evaluation::default();
        evaluation.read_report(BufReader::new(File::open(input)?))?;
        let report = evaluation.to_string();
        for line in report.lines() {
            log::debug!("{line}");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::parse_fb1;

    #[test]
    fn builtin_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        std::fs::write(&input, "Paris\tB-LOC\tB-LOC\nis\tO\tO\n\nJohn\tB-PER\tB-PER\nSmith\tI-PER\tO").unwrap();
        let report = ConllEval.score(&input).unwrap();
        assert!(report.starts_with("processed 4 tokens with 2 phrases; found: 2 phrases; correct: 1."));
        assert_eq!(parse_fb1(&report).unwrap(), 50.0);
    }

    #[test]
    fn missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = ScriptScorer::new(dir.path(), Duration::from_secs(5));
        assert_eq!(scorer.script(), dir.path().join("eval_conll_cmd.sh"));
        assert!(matches!(scorer.score(Path::new("input.txt")), Err(Error::ScoringUnavailable(_))));
    }
}
