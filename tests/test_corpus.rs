use nerbench::{Error, LabeledCorpus};

#[test]
fn test_last_document_without_trailing_blank_line() {
    let corpus = LabeledCorpus::from_file("tests/data/two_docs.conll").unwrap();
    assert_eq!(corpus.len(), 2);
    let last = &corpus.documents[1];
    assert_eq!(last.text(), "John Smith");
    assert_eq!(last.labels(), &["B-PER".to_string(), "I-PER".to_string()]);
}

#[test]
fn test_raw_text_joins_tokens_with_single_spaces() {
    let corpus = LabeledCorpus::from_file("tests/data/two_docs.conll").unwrap();
    assert_eq!(corpus.documents[0].text(), "Paris is nice");
    assert_eq!(corpus.documents[0].tokens().len(), corpus.documents[0].labels().len());
    assert_eq!(corpus.total_tokens(), 5);
}

#[test]
fn test_conll2003_document_markers() {
    let corpus = LabeledCorpus::from_file("tests/data/conll_sample.conll").unwrap();
    assert_eq!(corpus.len(), 3);
    assert_eq!(corpus.documents[0].text(), "EU rejects German call");
    assert_eq!(corpus.documents[2].labels(), &["B-LOC".to_string(), "O".to_string()]);
}

#[test]
fn test_malformed_line_reports_position() {
    match LabeledCorpus::from_file("tests/data/malformed.conll") {
        Err(e @ Error::CorpusFormat { .. }) => {
            let msg = e.to_string();
            assert!(msg.contains("line 2"), "{msg}");
            assert!(msg.contains("is O"), "{msg}");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_missing_gold_file() {
    assert!(matches!(LabeledCorpus::from_file("tests/data/does-not-exist.conll"), Err(Error::Io(_))));
}
