use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ANNOTATORS: &str = "annotators";
pub const TOKENIZE_WHITESPACE: &str = "tokenize.whitespace";
pub const NER_MODEL: &str = "ner.model";
pub const NER_FINE_GRAINED: &str = "ner.applyFineGrained";
pub const NER_SUTIME: &str = "ner.useSUTime";
pub const NER_NUMERIC_CLASSIFIERS: &str = "ner.applyNumericClassifiers";
pub const PROPS: &str = "props";

/// Flat string options handed to the annotation pipeline.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineOptions(BTreeMap<String, String>);

impl PipelineOptions {
    pub fn set<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Gold tokens are already split; the pipeline must keep them as they are.
    pub fn with_whitespace_tokenization(self) -> Self {
        self.set(TOKENIZE_WHITESPACE, "true")
    }

    fn basic_ner(annotators: &str) -> Self {
        Self::default()
            .set(ANNOTATORS, annotators)
            .with_whitespace_tokenization()
            .set(NER_FINE_GRAINED, "false")
            .set(NER_SUTIME, "false")
            .set(NER_NUMERIC_CLASSIFIERS, "false")
    }
}

/// One benchmark case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Relative paths resolve against the working directory.
    pub gold_file: PathBuf,
    /// Minimum FB1, inclusive.
    pub threshold: f64,
    #[serde(default)]
    pub options: PipelineOptions,
}

impl Scenario {
    pub fn new<N: Into<String>, P: Into<PathBuf>>(name: N, gold_file: P, threshold: f64) -> Self {
        Self { name: name.into(), gold_file: gold_file.into(), threshold, options: PipelineOptions::default() }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn gold_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.gold_file)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("scenario without a name".into()));
        }
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(Error::Config(format!("{}: threshold {} outside 0..=100", self.name, self.threshold)));
        }
        Ok(())
    }
}

const ENGLISH_CONLL_MODEL: &str = "edu/stanford/nlp/models/ner/english.conll.4class.distsim.crf.ser.gz";
const ENGLISH_ALL_MODEL: &str = "edu/stanford/nlp/models/ner/english.all.3class.distsim.crf.ser.gz";
const GERMAN_PROPS: &str = "StanfordCoreNLP-german.properties";

/// The standing regression suite.
pub fn builtin() -> Vec<Scenario> {
    let english = |model: &str| PipelineOptions::basic_ner("tokenize,ssplit,pos,lemma,ner").set(NER_MODEL, model);
    let german = || PipelineOptions::basic_ner("tokenize,ssplit,pos,ner").set(PROPS, GERMAN_PROPS);
    vec![
        Scenario::new("CoNLL 2003 English Dev", "conll.4class.testa", 94.01).with_options(english(ENGLISH_CONLL_MODEL)),
        Scenario::new("CoNLL 2003 English Test", "conll.4class.testb", 90.24).with_options(english(ENGLISH_CONLL_MODEL)),
        Scenario::new("OntoNotes English Dev 3 Class", "ontonotes.3class.dev", 89.93).with_options(english(ENGLISH_ALL_MODEL)),
        Scenario::new("OntoNotes English Test 3 Class", "ontonotes.3class.test", 90.77).with_options(english(ENGLISH_ALL_MODEL)),
        Scenario::new("German CoNLL Dev 4 Class", "deu.io.f15.utf8.testa", 99.0).with_options(german()),
        Scenario::new("German CoNLL Test 4 Class", "deu.io.f15.utf8.testb", 99.0).with_options(german()),
    ]
}

/// Read a JSON array of scenarios.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Scenario>> {
    let f = File::open(path.as_ref())?;
    let scenarios: Vec<Scenario> = serde_json::from_reader(BufReader::new(f))?;
    let mut names = HashSet::new();
    for s in &scenarios {
        s.validate()?;
        if !names.insert(s.name.as_str()) {
            return Err(Error::Config(format!("duplicate scenario name {:?}", s.name)));
        }
    }
    Ok(scenarios)
}

/// Keep the scenarios named in `names`, in table order; every name must exist.
pub fn select(scenarios: Vec<Scenario>, names: &[String]) -> Result<Vec<Scenario>> {
    if names.is_empty() {
        return Ok(scenarios);
    }
    if let Some(missing) = names.iter().find(|n| !scenarios.iter().any(|s| &s.name == *n)) {
        return Err(Error::Config(format!("unknown scenario {:?}", missing)));
    }
    Ok(scenarios.into_iter().filter(|s| names.contains(&s.name)).collect())
}
