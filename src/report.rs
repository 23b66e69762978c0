use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    annotate::PredictedDocument,
    corpus::LabeledCorpus,
    error::{Error, Result},
};

pub const REPORT_PREFIX: &str = "conllEvalInput";

fn check_alignment(corpus: &LabeledCorpus, predictions: &[PredictedDocument]) -> Result<()> {
    for i in 0..corpus.len().max(predictions.len()) {
        let gold = corpus.documents.get(i).map_or(0, |d| d.len());
        let predicted = predictions.get(i).map_or(0, |p| p.len());
        if gold != predicted || i >= corpus.len() || i >= predictions.len() {
            return Err(Error::Alignment { document: i, gold, predicted });
        }
    }
    Ok(())
}

/// Write `token\tgold\tpredicted` lines, one blank line between documents and
/// nothing after the last token line.
///
/// Alignment is checked before the first byte is written. Documents without
/// tokens are skipped.
pub fn write_report<W: Write>(out: W, corpus: &LabeledCorpus, predictions: &[PredictedDocument]) -> Result<()> {
    check_alignment(corpus, predictions)?;
    let mut out = BufWriter::new(out);
    let mut first = true;
    for (doc, pred) in corpus.iter().zip(predictions) {
        if doc.is_empty() {
            continue;
        }
        if !first {
            out.write_all(b"\n")?;
        }
        for ((token, gold), predicted) in doc.tokens().iter().zip(doc.labels()).zip(&pred.labels) {
            if !first {
                out.write_all(b"\n")?;
            }
            write!(out, "{token}\t{gold}\t{predicted}")?;
            first = false;
        }
    }
    out.flush()?;
    Ok(())
}

/// Scorer input file inside the working directory, unique per run and removed
/// on drop unless kept.
#[derive(Debug)]
pub struct ReportFile {
    file: NamedTempFile,
}

impl ReportFile {
    pub fn create(work_dir: &Path, corpus: &LabeledCorpus, predictions: &[PredictedDocument]) -> Result<Self> {
        check_alignment(corpus, predictions)?;
        let file = tempfile::Builder::new()
            .prefix(REPORT_PREFIX)
            .suffix(".txt")
            .tempfile_in(work_dir)?;
        write_report(file.as_file(), corpus, predictions)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Stop the file from being deleted and return where it lives.
    pub fn keep(self) -> Result<PathBuf> {
        let (_, path) = self.file.keep().map_err(|e| Error::Io(e.error))?;
        Ok(path)
    }
}
