use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    annotate::{annotate_corpus, Annotator},
    corpus::LabeledCorpus,
    error::{Error, Result},
    metric::{check_threshold, parse_fb1},
    report::ReportFile,
    scenario::Scenario,
    scorer::Scorer,
};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Holds gold files, the scoring script and intermediate reports.
    pub work_dir: PathBuf,
    pub scorer_timeout: Duration,
    pub annotate_timeout: Duration,
    /// Leave each scorer input file behind instead of deleting it.
    pub keep_report: bool,
}

impl HarnessConfig {
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.into(),
            scorer_timeout: Duration::from_secs(600),
            annotate_timeout: Duration::from_secs(300),
            keep_report: false,
        }
    }

    pub fn scorer_timeout(mut self, timeout: Duration) -> Self {
        self.scorer_timeout = timeout;
        self
    }

    pub fn annotate_timeout(mut self, timeout: Duration) -> Self {
        self.annotate_timeout = timeout;
        self
    }

    pub fn keep_report(mut self, keep: bool) -> Self {
        self.keep_report = keep;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Load, annotate, write, score and check one scenario. Returns the FB1 score.
pub fn run_scenario(
    config: &HarnessConfig,
    scenario: &Scenario,
    annotator: &mut dyn Annotator,
    scorer: &dyn Scorer,
) -> Result<f64> {
    let gold_path = scenario.gold_path(config.work_dir());
    let corpus = LabeledCorpus::from_file(&gold_path)?;
    log::info!(
        "{}: loaded {} documents ({} tokens) from {}",
        scenario.name,
        corpus.len(),
        corpus.total_tokens(),
        gold_path.display()
    );

    let predictions = annotate_corpus(annotator, &corpus)?;
    let report = ReportFile::create(config.work_dir(), &corpus, &predictions)?;
    log::info!("running eval script for {}", scenario.name);
    let output = scorer.score(report.path());
    if config.keep_report {
        let path = report.keep()?;
        log::info!("{}: scorer input kept at {}", scenario.name, path.display());
    }

    let f1 = parse_fb1(&output?)?;
    log::info!("Current F1 score for {} is: {:.2}", scenario.name, f1);
    check_threshold(&scenario.name, scenario.threshold, f1)?;
    Ok(f1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    /// Scored below the threshold.
    Failed,
    /// No score could be produced.
    Error,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Passed => "PASS",
            Status::Failed => "FAIL",
            Status::Error => "ERROR",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub status: Status,
    pub threshold: f64,
    pub f1: Option<f64>,
    pub message: Option<String>,
    pub elapsed_secs: f64,
}

impl ScenarioOutcome {
    fn new(scenario: &Scenario, result: Result<f64>, elapsed: Duration) -> Self {
        let (status, f1, message) = match result {
            Ok(f1) => (Status::Passed, Some(f1), None),
            Err(e) => match e {
                Error::ThresholdNotMet { observed, .. } => (Status::Failed, Some(observed), Some(e.to_string())),
                _ => (Status::Error, None, Some(e.to_string())),
            },
        };
        Self {
            name: scenario.name.clone(),
            status,
            threshold: scenario.threshold,
            f1,
            message,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SuiteReport {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == Status::Passed)
    }

    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

impl Display for SuiteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for o in &self.outcomes {
            let f1 = o.f1.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
            writeln!(f, "{:<6} {:>7} / {:>6.2}  {:>8.1}s  {}", o.status, f1, o.threshold, o.elapsed_secs, o.name)?;
            if let Some(message) = &o.message {
                writeln!(f, "       {message}")?;
            }
        }
        write!(
            f,
            "{} passed, {} failed, {} errors",
            self.count(Status::Passed),
            self.count(Status::Failed),
            self.count(Status::Error)
        )
    }
}

/// Run every scenario, even after one fails.
///
/// `make_annotator` builds the pipeline for a scenario from its options.
pub fn run_suite<F>(config: &HarnessConfig, scenarios: &[Scenario], mut make_annotator: F, scorer: &dyn Scorer) -> SuiteReport
where
    F: FnMut(&Scenario) -> Result<Box<dyn Annotator>>,
{
    let mut report = SuiteReport::default();
    for scenario in scenarios {
        log::info!("---");
        let begin = Instant::now();
        let result = make_annotator(scenario).and_then(|mut annotator| run_scenario(config, scenario, &mut *annotator, scorer));
        let outcome = ScenarioOutcome::new(scenario, result, begin.elapsed());
        match outcome.status {
            Status::Passed => log::info!("{} passed in {:?}", scenario.name, begin.elapsed()),
            Status::Failed | Status::Error => log::error!("{}", outcome.message.as_deref().unwrap_or_default()),
        }
        report.outcomes.push(outcome);
    }
    report
}
