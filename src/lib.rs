//! Accuracy-regression harness for NER pipelines.
//!
//! Each [`Scenario`] loads a gold CoNLL file, runs every document through an
//! [`Annotator`], writes `token gold predicted` lines for a conlleval-style
//! [`Scorer`] and checks the reported FB1 against the scenario's threshold.

pub mod annotate;
pub mod corpus;
mod error;
pub mod evaluation;
pub mod harness;
pub mod metric;
pub mod process;
pub mod report;
pub mod scenario;
pub mod scorer;

pub use annotate::{annotate_corpus, AnnotatedDocument, AnnotatedToken, Annotator, CommandAnnotator, PredictedDocument};
pub use corpus::{LabeledCorpus, LabeledDocument};
pub use error::{Error, Result};
pub use evaluation::{Evaluation, Measure};
pub use harness::{run_scenario, run_suite, HarnessConfig, ScenarioOutcome, Status, SuiteReport};
pub use scenario::{PipelineOptions, Scenario};
pub use scorer::{ConllEval, Scorer, ScriptScorer};
