use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    iter,
    path::Path,
};

use crate::error::{Error, Result};

const DOCSTART: &str = "-DOCSTART-";

/// One blank-line-delimited block of a gold file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDocument {
    tokens: Vec<String>,
    labels: Vec<String>,
    text: String,
}

impl LabeledDocument {
    /// Tokens and gold labels must have the same length.
    pub fn new(tokens: Vec<String>, labels: Vec<String>) -> Result<Self> {
        if tokens.len() != labels.len() {
            return Err(Error::Config(format!(
                "{} tokens but {} gold labels",
                tokens.len(),
                labels.len()
            )));
        }
        let text = tokens.join(" ");
        Ok(Self { tokens, labels, text })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Tokens joined by single spaces, the input handed to the pipeline.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Default)]
struct DocumentBuilder {
    tokens: Vec<String>,
    labels: Vec<String>,
}

impl DocumentBuilder {
    fn push(&mut self, token: &str, label: &str) {
        self.tokens.push(token.to_string());
        self.labels.push(label.to_string());
    }

    fn take(&mut self) -> Option<LabeledDocument> {
        if self.tokens.is_empty() {
            return None;
        }
        let tokens = std::mem::take(&mut self.tokens);
        let labels = std::mem::take(&mut self.labels);
        let text = tokens.join(" ");
        Some(LabeledDocument { tokens, labels, text })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabeledCorpus {
    pub documents: Vec<LabeledDocument>,
}

impl LabeledCorpus {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)?;
        Self::read_from(f, path)
    }

    /// Parse a tab-separated gold file. `origin` only labels error messages.
    pub fn read_from<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let mut corpus = Self::default();
        let mut doc = DocumentBuilder::default();
        // the synthetic blank line flushes the last document
        let lines = BufReader::new(reader).lines().chain(iter::once(Ok(String::new())));
        for (i, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with(DOCSTART) {
                if let Some(d) = doc.take() {
                    corpus.documents.push(d);
                }
                continue;
            }
            let mut fields = line.split('\t');
            match (fields.next(), fields.next()) {
                (Some(token), Some(label)) => doc.push(token, label),
                _ => {
                    return Err(Error::CorpusFormat {
                        path: origin.to_path_buf(),
                        line: i + 1,
                        content: line,
                    })
                }
            }
        }
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.documents.iter().map(|x| x.len()).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledDocument> {
        self.documents.iter()
    }
}

impl From<Vec<LabeledDocument>> for LabeledCorpus {
    fn from(documents: Vec<LabeledDocument>) -> Self {
        Self { documents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<LabeledCorpus> {
        LabeledCorpus::read_from(s.as_bytes(), Path::new("inline"))
    }

    #[test]
    fn split_on_blank_lines() {
        let corpus = parse("Paris\tB-LOC\nis\tO\n\n\nJohn\tB-PER\tNNP\n").unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents[0].text(), "Paris is");
        assert_eq!(corpus.documents[1].labels(), &["B-PER".to_string()]);
        assert_eq!(corpus.total_tokens(), 3);
    }

    #[test]
    fn docstart_closes_document() {
        let corpus = parse("-DOCSTART-\tO\n\nEU\tB-ORG\n-DOCSTART-\tO\nBonn\tB-LOC").unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents[0].text(), "EU");
        assert_eq!(corpus.documents[1].text(), "Bonn");
    }

    #[test]
    fn line_without_tab() {
        match parse("Paris\tB-LOC\nis O\n") {
            Err(Error::CorpusFormat { line, content, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "is O");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n").unwrap().is_empty());
    }

    #[test]
    fn mismatched_document() {
        assert!(LabeledDocument::new(vec!["a".into()], vec![]).is_err());
    }
}
