use std::{collections::BTreeMap, fmt::Display, io::BufRead, iter::zip};

use crate::error::{Error, Result};

/// Chunk counts for one entity type, or for all of them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    /// Chunks whose span and type both match the gold chunk.
    pub n_correct: usize,
    /// Chunks in the gold-standard data.
    pub n_gold: usize,
    /// Chunks predicted by the pipeline.
    pub n_predicted: usize,
}

impl Measure {
    /// Percentage, 0 when nothing was predicted.
    #[inline]
    pub fn precision(&self) -> f64 {
        if self.n_predicted == 0 {
            return 0.0;
        }
        100.0 * self.n_correct as f64 / self.n_predicted as f64
    }

    #[inline]
    pub fn recall(&self) -> f64 {
        if self.n_gold == 0 {
            return 0.0;
        }
        100.0 * self.n_correct as f64 / self.n_gold as f64
    }

    #[inline]
    pub fn fmeasure(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// `B-PER` -> ("B", "PER"), `O` -> ("O", "").
fn split_label(label: &str) -> (&str, &str) {
    match label.split_once('-') {
        Some((prefix, kind)) => (prefix, kind),
        None => (label, ""),
    }
}

fn end_of_chunk(prev_tag: &str, tag: &str, prev_type: &str, kind: &str) -> bool {
    match (prev_tag, tag) {
        ("E", _) | ("S", _) => true,
        ("B", "B" | "S" | "O") | ("I", "B" | "S" | "O") => true,
        _ => prev_tag != "O" && prev_type != kind,
    }
}

fn start_of_chunk(prev_tag: &str, tag: &str, prev_type: &str, kind: &str) -> bool {
    match (prev_tag, tag) {
        (_, "B") | (_, "S") => true,
        ("E" | "S" | "O", "E" | "I") => true,
        _ => tag != "O" && prev_type != kind,
    }
}

/// Chunk-level scoring of IOB-tagged sequences, reported the way conlleval
/// reports it.
#[derive(Debug, Default)]
pub struct Evaluation {
    tbl: BTreeMap<String, Measure>,
    overall: Measure,
    /// Tokens whose predicted label equals the gold label.
    n_correct_tags: usize,
    /// Sequences accumulated so far.
    n_sequences: usize,
    n_tokens: usize,
}

#[derive(Default)]
struct ChunkState<'a> {
    in_correct: bool,
    last_gold: (&'a str, &'a str),
    last_predicted: (&'a str, &'a str),
}

impl<'a> ChunkState<'a> {
    fn step(&mut self, eval: &mut Evaluation, gold: (&'a str, &'a str), predicted: (&'a str, &'a str)) {
        let (gold_tag, gold_type) = gold;
        let (pred_tag, pred_type) = predicted;
        let (last_gold_tag, last_gold_type) = self.last_gold;
        let (last_pred_tag, last_pred_type) = self.last_predicted;

        if self.in_correct {
            let gold_end = end_of_chunk(last_gold_tag, gold_tag, last_gold_type, gold_type);
            let pred_end = end_of_chunk(last_pred_tag, pred_tag, last_pred_type, pred_type);
            if gold_end && pred_end && last_gold_type == last_pred_type {
                self.in_correct = false;
                eval.overall.n_correct += 1;
                eval.tbl.entry(last_gold_type.to_string()).or_default().n_correct += 1;
            } else if gold_end != pred_end || gold_type != pred_type {
                self.in_correct = false;
            }
        }

        let gold_start = start_of_chunk(last_gold_tag, gold_tag, last_gold_type, gold_type);
        let pred_start = start_of_chunk(last_pred_tag, pred_tag, last_pred_type, pred_type);
        if gold_start && pred_start && gold_type == pred_type {
            self.in_correct = true;
        }
        if gold_start {
            eval.overall.n_gold += 1;
            eval.tbl.entry(gold_type.to_string()).or_default().n_gold += 1;
        }
        if pred_start {
            eval.overall.n_predicted += 1;
            eval.tbl.entry(pred_type.to_string()).or_default().n_predicted += 1;
        }

        self.last_gold = gold;
        self.last_predicted = predicted;
    }
}

impl Evaluation {
    /// Score one sequence. Both slices must have the same length; a mismatch
    /// names the sequence by its 0-based position among those accumulated.
    pub fn accumulate<G: AsRef<str>, P: AsRef<str>>(&mut self, gold: &[G], predicted: &[P]) -> Result<()> {
        if gold.len() != predicted.len() {
            return Err(Error::Alignment { document: self.n_sequences, gold: gold.len(), predicted: predicted.len() });
        }
        let mut state = ChunkState { last_gold: ("O", ""), last_predicted: ("O", ""), ..Default::default() };
        for (g, p) in zip(gold, predicted) {
            let (g, p) = (g.as_ref(), p.as_ref());
            state.step(self, split_label(g), split_label(p));
            if g == p {
                self.n_correct_tags += 1;
            }
            self.n_tokens += 1;
        }
        // a sequence boundary closes any open chunk
        state.step(self, ("O", ""), ("O", ""));
        self.n_sequences += 1;
        Ok(())
    }

    /// Score a `token gold predicted` file: the last two tab-separated columns
    /// of each line, blank lines separating sequences.
    pub fn read_report<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut gold = Vec::new();
        let mut predicted = Vec::new();
        for (i, line) in reader.lines().chain(std::iter::once(Ok(String::new()))).enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                if !gold.is_empty() {
                    self.accumulate(&gold, &predicted)?;
                    gold.clear();
                    predicted.clear();
                }
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(Error::ScoringUnavailable(format!(
                    "line {}: expected token, gold and predicted columns, got {:?}",
                    i + 1,
                    line
                )));
            }
            gold.push(fields[fields.len() - 2].to_string());
            predicted.push(fields[fields.len() - 1].to_string());
        }
        Ok(())
    }

    pub fn overall(&self) -> Measure {
        self.overall
    }

    pub fn by_type(&self, kind: &str) -> Option<Measure> {
        self.tbl.get(kind).copied()
    }

    pub fn accuracy(&self) -> f64 {
        if self.n_tokens == 0 {
            return 0.0;
        }
        100.0 * self.n_correct_tags as f64 / self.n_tokens as f64
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "processed {} tokens with {} phrases; found: {} phrases; correct: {}.",
            self.n_tokens, self.overall.n_gold, self.overall.n_predicted, self.overall.n_correct
        )?;
        if self.n_tokens == 0 {
            return Ok(());
        }
        writeln!(
            f,
            "accuracy: {:6.2}%; precision: {:6.2}%; recall: {:6.2}%; FB1: {:6.2}",
            self.accuracy(),
            self.overall.precision(),
            self.overall.recall(),
            self.overall.fmeasure()
        )?;
        for (kind, m) in self.tbl.iter().filter(|(k, _)| !k.is_empty()) {
            writeln!(
                f,
                "{:>17}: precision: {:6.2}%; recall: {:6.2}%; FB1: {:6.2}  {}",
                kind,
                m.precision(),
                m.recall(),
                m.fmeasure(),
                m.n_predicted
            )?;
        }
        Ok(())
    }
}
