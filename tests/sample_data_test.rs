//! Checks the quiz and tag mapping shipped under `quizzes/`.

use std::path::PathBuf;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use quiz_flow_engine::source::{load_tag_mapping, JsonDirSource, QuizCatalog};
use quiz_flow_engine::{TagResolver, TraversalEngine};

fn quizzes_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("quizzes")
}

#[tokio::test]
async fn test_shipped_default_quiz_walks_to_results() {
    let catalog = QuizCatalog::new("default").with_source(JsonDirSource::new(quizzes_dir()));
    let graph = catalog.load("default").await.unwrap().unwrap();
    let mapping = load_tag_mapping(&quizzes_dir().join("tag-mapping.json")).await.unwrap();

    let mut engine = TraversalEngine::start(Arc::clone(&graph)).unwrap();
    engine.select_option("self").unwrap();
    engine.select_option("crisis").unwrap();
    engine.select_option("urgent").unwrap();
    assert!(engine.is_terminal());

    let filter = TagResolver::new(mapping).resolve(engine.collected_tags());
    assert_eq!(
        serde_json::to_value(&filter).unwrap(),
        json!({
            "resource_category": ["help-with-treatment"],
            "resource_tags": ["for-people-in-recovery", "interventions", "treatment"]
        })
    );
}

#[tokio::test]
async fn test_shipped_quiz_gates_urgent_option_on_crisis() {
    let catalog = QuizCatalog::new("default").with_source(JsonDirSource::new(quizzes_dir()));
    let graph = catalog.load("default").await.unwrap().unwrap();

    let mut engine = TraversalEngine::start(graph).unwrap();
    engine.select_option("professional").unwrap();

    let offered: Vec<&str> = engine
        .available_options()
        .iter()
        .map(|o| o.id.as_str())
        .collect();
    assert_eq!(offered, vec!["learn", "peers", "grief"]);
}

#[tokio::test]
async fn test_shipped_mapping_pattern_fallback() {
    let mapping = load_tag_mapping(&quizzes_dir().join("tag-mapping.json")).await.unwrap();
    let filter = TagResolver::new(mapping).resolve(&["need:housing".to_string()]);
    assert_eq!(
        serde_json::to_value(&filter).unwrap(),
        json!({"resource_category": ["literature"]})
    );
}
