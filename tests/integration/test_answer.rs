//! Answer generation over a real index with a scripted generator.

use std::sync::Arc;

use docent::answer::{AnswerGenerator, Answerer, INSUFFICIENT_CONTEXT, Prompt};
use docent::retrieval::{IndexHandle, RetrievalService};
use docent::{RagError, RagResult};
use parking_lot::Mutex;

use crate::common::{TestCorpus, cat_and_stocks, keyword_client, keyword_pipeline};

#[derive(Default)]
struct ScriptedGenerator {
    prompts: Mutex<Vec<Prompt>>,
}

impl AnswerGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &Prompt) -> RagResult<String> {
        self.prompts.lock().push(prompt.clone());
        Ok("The cat slept [1].\n\nSources\n[1] cat.txt".to_string())
    }

    fn ping(&self) -> RagResult<String> {
        Ok("OK".to_string())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn answerer(corpus: &TestCorpus) -> (Answerer, Arc<ScriptedGenerator>) {
    let (client, _) = keyword_client();
    let retrieval = RetrievalService::new(Arc::new(IndexHandle::new(corpus.index_path())), client);
    let generator = Arc::new(ScriptedGenerator::default());
    (Answerer::new(retrieval, generator.clone()), generator)
}

#[test]
fn test_prompt_carries_retrieved_context() {
    let corpus = cat_and_stocks();
    keyword_pipeline()
        .ingest(corpus.source(), &corpus.index_path())
        .unwrap();
    let (answerer, generator) = answerer(&corpus);

    let answer = answerer.ask("Where did the cat sleep?", Some(1)).unwrap();
    assert_eq!(answer.chunks.len(), 1);
    assert!(answer.chunks[0].chunk.source_id.ends_with("cat.txt"));
    assert!(answer.answer.contains("[1]"));

    let prompts = generator.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("The cat sat. The cat slept."));
    assert!(!prompts[0].user.contains("Stocks rose today."));
    assert!(prompts[0].user.contains("Question: Where did the cat sleep?"));
}

#[test]
fn test_missing_index_fails_before_generation() {
    let corpus = TestCorpus::new();
    let (answerer, generator) = answerer(&corpus);

    let err = answerer.ask("Anything?", None).unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound { .. }));
    assert!(generator.prompts.lock().is_empty());
}

#[test]
fn test_blank_question_is_rejected() {
    let corpus = TestCorpus::new();
    let (answerer, _) = answerer(&corpus);
    assert!(matches!(answerer.ask("  ", None), Err(RagError::EmptyQuery)));
    assert!(!INSUFFICIENT_CONTEXT.is_empty());
}
