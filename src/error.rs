use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Gold file line without a tab separator.
    #[error("malformed line {line} in {}: {content:?}", .path.display())]
    CorpusFormat {
        path: PathBuf,
        line: usize,
        content: String,
    },
    #[error("document {document}: {gold} gold tokens but {predicted} predicted tokens")]
    Alignment {
        document: usize,
        gold: usize,
        predicted: usize,
    },
    #[error("annotation failed: {0}")]
    Annotation(String),
    #[error("scorer unavailable: {0}")]
    ScoringUnavailable(String),
    #[error("no FB1 metric found in scorer output")]
    MetricNotFound,
    #[error("{scenario} failed: should have found F1 of at least {threshold:.2} but found F1 of {observed:.2}")]
    ThresholdNotMet {
        scenario: String,
        threshold: f64,
        observed: f64,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// A below-threshold score is a test failure; everything else means the
    /// harness itself could not produce a score.
    pub fn is_failure(&self) -> bool {
        matches!(self, Error::ThresholdNotMet { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Config(value.to_string())
    }
}
