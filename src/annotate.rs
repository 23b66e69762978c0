use std::{
    ffi::OsString,
    path::PathBuf,
    process::Command,
    time::Duration,
};

use crate::{
    corpus::LabeledCorpus,
    error::{Error, Result},
    process::{describe_failure, run_bounded},
    scenario::PipelineOptions,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedToken {
    pub word: String,
    pub label: String,
}

impl AnnotatedToken {
    pub fn new<W: Into<String>, L: Into<String>>(word: W, label: L) -> Self {
        Self { word: word.into(), label: label.into() }
    }
}

/// Pipeline output for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedDocument {
    pub tokens: Vec<AnnotatedToken>,
}

impl AnnotatedDocument {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Predicted labels, positionally aligned with a gold document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictedDocument {
    pub labels: Vec<String>,
}

impl PredictedDocument {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<AnnotatedDocument> for PredictedDocument {
    fn from(doc: AnnotatedDocument) -> Self {
        Self { labels: doc.tokens.into_iter().map(|t| t.label).collect() }
    }
}

/// An NER pipeline that tags whitespace-tokenized text.
///
/// Implementations must not re-tokenize: the returned document has one token
/// per space-separated input token.
pub trait Annotator {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument>;
}

impl<A: Annotator + ?Sized> Annotator for Box<A> {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
        (**self).annotate(text)
    }
}

/// Run every document through `annotator`, one call per document.
///
/// The first pipeline error or token-count mismatch aborts the whole corpus.
pub fn annotate_corpus<A: Annotator + ?Sized>(annotator: &mut A, corpus: &LabeledCorpus) -> Result<Vec<PredictedDocument>> {
    let mut predictions = Vec::with_capacity(corpus.len());
    for (i, doc) in corpus.iter().enumerate() {
        let annotated = annotator.annotate(doc.text())?;
        if annotated.len() != doc.len() {
            return Err(Error::Alignment { document: i, gold: doc.len(), predicted: annotated.len() });
        }
        if let Some((gold, token)) = doc.tokens().iter().zip(&annotated.tokens).find(|(g, t)| **g != t.word) {
            log::warn!("document {i}: pipeline word {:?} differs from gold token {:?}", token.word, gold);
        }
        predictions.push(annotated.into());
    }
    Ok(predictions)
}

/// Drives an external pipeline process once per document.
///
/// Each option becomes a `-key value` argument; the raw text goes to stdin and
/// stdout is read as tab-separated lines, blank lines being sentence breaks.
/// Whitespace tokenization is always switched on, whatever the options say.
#[derive(Debug, Clone)]
pub struct CommandAnnotator {
    program: PathBuf,
    args: Vec<OsString>,
    word_column: usize,
    label_column: usize,
    timeout: Duration,
}

impl CommandAnnotator {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            word_column: 0,
            label_column: 1,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn options(mut self, options: &PipelineOptions) -> Self {
        let options = options.clone().with_whitespace_tokenization();
        for (key, value) in options.iter() {
            self.args.push(format!("-{key}").into());
            self.args.push(value.into());
        }
        self
    }

    pub fn columns(mut self, word: usize, label: usize) -> Self {
        self.word_column = word;
        self.label_column = label;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse_output(&self, stdout: &str) -> Result<AnnotatedDocument> {
        let mut doc = AnnotatedDocument::default();
        for (i, line) in stdout.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match (fields.get(self.word_column), fields.get(self.label_column)) {
                (Some(word), Some(label)) => doc.tokens.push(AnnotatedToken::new(*word, *label)),
                _ => {
                    return Err(Error::Annotation(format!(
                        "{}: output line {} has {} columns: {:?}",
                        self.program.display(),
                        i + 1,
                        fields.len(),
                        line
                    )))
                }
            }
        }
        Ok(doc)
    }
}

impl Annotator for CommandAnnotator {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        let captured = run_bounded(&mut cmd, Some(text.as_bytes().to_vec()), self.timeout)
            .map_err(|e| Error::Annotation(format!("{}: {e}", self.program.display())))?;
        if !captured.status.success() {
            return Err(Error::Annotation(format!("{}: {}", self.program.display(), describe_failure(&captured))));
        }
        self.parse_output(&captured.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LabeledDocument;
    use std::path::Path;

    struct Uppercase;

    impl Annotator for Uppercase {
        fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
            let tokens = text
                .split(' ')
                .map(|w| {
                    let label = if w.starts_with(char::is_uppercase) { "B-MISC" } else { "O" };
                    AnnotatedToken::new(w, label)
                })
                .collect();
            Ok(AnnotatedDocument { tokens })
        }
    }

    struct Swallow;

    impl Annotator for Swallow {
        fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
            let mut doc = Uppercase.annotate(text)?;
            doc.tokens.pop();
            Ok(doc)
        }
    }

    fn corpus() -> LabeledCorpus {
        LabeledCorpus::read_from("Paris\tB-LOC\nis\tO\n\nnice\tO\n".as_bytes(), Path::new("inline")).unwrap()
    }

    #[test]
    fn one_prediction_per_document() {
        let predictions = annotate_corpus(&mut Uppercase, &corpus()).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].labels, vec!["B-MISC", "O"]);
        assert_eq!(predictions[1].labels, vec!["O"]);
    }

    #[test]
    fn dropped_token_fails_fast() {
        match annotate_corpus(&mut Swallow, &corpus()) {
            Err(Error::Alignment { document, gold, predicted }) => assert_eq!((document, gold, predicted), (0, 2, 1)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn boxed_annotator() {
        let mut boxed: Box<dyn Annotator> = Box::new(Uppercase);
        let doc = LabeledDocument::new(vec!["Bonn".into()], vec!["B-LOC".into()]).unwrap();
        assert_eq!(boxed.annotate(doc.text()).unwrap().tokens[0].label, "B-MISC");
    }

    #[test]
    fn parse_selected_columns() {
        let annotator = CommandAnnotator::new("pipeline").columns(1, 4);
        let doc = annotator
            .parse_output("1\tJohn\tjohn\tNNP\tPERSON\n2\tran\trun\tVBD\tO\n\n1\tHome\thome\tNN\tO\n")
            .unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.tokens[0], AnnotatedToken::new("John", "PERSON"));
    }

    #[test]
    fn short_output_line() {
        let annotator = CommandAnnotator::new("pipeline");
        assert!(matches!(annotator.parse_output("John\n"), Err(Error::Annotation(_))));
    }

    #[cfg(unix)]
    #[test]
    fn runs_external_pipeline() {
        let mut annotator = CommandAnnotator::new("sh")
            .arg("-c")
            .arg("tr ' ' '\\n' | sed 's/$/\\tO/'");
        let doc = annotator.annotate("a b c").unwrap();
        assert_eq!(doc.len(), 3);
        assert!(doc.tokens.iter().all(|t| t.label == "O"));
    }

    #[test]
    fn options_become_flag_value_pairs() {
        let options = PipelineOptions::default()
            .set("annotators", "tokenize,ner")
            .set("tokenize.whitespace", "false");
        let annotator = CommandAnnotator::new("pipeline").arg("-quiet").options(&options);
        let args: Vec<_> = annotator.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-quiet", "-annotators", "tokenize,ner", "-tokenize.whitespace", "true"]);
    }

    #[cfg(unix)]
    #[test]
    fn pipeline_is_told_to_keep_whitespace_tokens() {
        // one output line per argument, labelled with the argument that follows it
        let script = r#"cat >/dev/null; while [ $# -gt 1 ]; do printf '%s\t%s\n' "$1" "$2"; shift 2; done"#;
        let options = PipelineOptions::default().set("annotators", "tokenize,ner");
        let mut annotator = CommandAnnotator::new("sh").arg("-c").arg(script).arg("sh").options(&options);
        let doc = annotator.annotate("Paris is nice").unwrap();
        assert_eq!(
            doc.tokens,
            vec![
                AnnotatedToken::new("-annotators", "tokenize,ner"),
                AnnotatedToken::new("-tokenize.whitespace", "true"),
            ]
        );
    }
}
