//! Tag resolver integration tests
//!
//! Covers the reference mapping fixture, determinism, and bucket membership
//! under permutations of the collected tags.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use quiz_flow_engine::{QuizGraph, ResolvedFilter, TagFilterMapping, TagResolver, TraversalEngine};

fn reference_mapping() -> TagFilterMapping {
    TagFilterMapping::from_value(&json!({
        "stage:crisis": {
            "resource_category": ["help-with-treatment"],
            "resource_tags": ["interventions", "treatment"]
        },
        "audience:*": {"resource_tags": ["for-people-in-recovery"]}
    }))
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn membership(filter: &ResolvedFilter) -> BTreeMap<String, BTreeSet<String>> {
    filter
        .iter()
        .map(|(taxonomy, terms)| (taxonomy.to_string(), terms.iter().cloned().collect()))
        .collect()
}

fn permutations(items: &[String]) -> Vec<Vec<String>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_reference_fixture_exact_output() {
    let resolver = TagResolver::new(reference_mapping());
    let filter = resolver.resolve(&tags(&["stage:crisis", "audience:self", "stage:crisis"]));

    assert_eq!(
        serde_json::to_string(&filter).unwrap(),
        json!({
            "resource_category": ["help-with-treatment"],
            "resource_tags": ["interventions", "treatment", "for-people-in-recovery"]
        })
        .to_string()
    );
}

#[test]
fn test_resolution_is_deterministic() {
    let resolver = TagResolver::new(reference_mapping());
    let collected = tags(&["audience:family", "stage:crisis", "need:none", "audience:self"]);

    let first = serde_json::to_string(&resolver.resolve(&collected)).unwrap();
    for _ in 0..10 {
        assert_eq!(serde_json::to_string(&resolver.resolve(&collected)).unwrap(), first);
    }
}

#[test]
fn test_permutations_converge_on_membership() {
    let mapping = TagFilterMapping::new()
        .with_entry(
            "stage:crisis",
            [
                ("resource_category", vec!["help-with-treatment"]),
                ("resource_tags", vec!["interventions", "treatment"]),
            ],
        )
        .with_entry("audience:*", [("resource_tags", vec!["for-people-in-recovery"])])
        .with_entry("need:grief", [("resource_tags", vec!["grief", "treatment"])])
        .with_entry("need:*", [("support_type", vec!["peer"])]);
    let resolver = TagResolver::new(mapping);

    let base = tags(&["stage:crisis", "audience:self", "need:grief", "need:housing", "stage:crisis"]);
    let expected = membership(&resolver.resolve(&base));
    assert_eq!(expected.len(), 3);

    for permutation in permutations(&base) {
        assert_eq!(membership(&resolver.resolve(&permutation)), expected);
    }

    // duplicate counts do not change membership either
    let deduped = tags(&["need:housing", "need:grief", "audience:self", "stage:crisis"]);
    assert_eq!(membership(&resolver.resolve(&deduped)), expected);
}

#[test]
fn test_order_within_bucket_follows_first_occurrence() {
    let resolver = TagResolver::new(reference_mapping());

    let forward = resolver.resolve(&tags(&["stage:crisis", "audience:self"]));
    let backward = resolver.resolve(&tags(&["audience:self", "stage:crisis"]));

    assert_eq!(
        forward.get("resource_tags").unwrap(),
        tags(&["interventions", "treatment", "for-people-in-recovery"]).as_slice()
    );
    assert_eq!(
        backward.get("resource_tags").unwrap(),
        tags(&["for-people-in-recovery", "interventions", "treatment"]).as_slice()
    );
}

#[test]
fn test_empty_tags_resolve_to_no_buckets() {
    let filter = TagResolver::new(reference_mapping()).resolve(&[]);
    assert!(filter.is_empty());
    assert_eq!(serde_json::to_value(&filter).unwrap(), json!({}));
}

#[test]
fn test_malformed_entries_do_not_abort_resolution() {
    let mut mapping = reference_mapping();
    mapping.insert_raw("need:grief", json!(["not", "a", "mapping"]));
    mapping.insert_raw("need:*", json!({"resource_tags": "grief"}));

    let resolution = TagResolver::new(mapping)
        .resolve_detailed(&tags(&["need:grief", "need:housing", "stage:crisis"]));

    assert_eq!(resolution.issues.len(), 2);
    assert_eq!(
        resolution.filter.get("resource_category").unwrap(),
        tags(&["help-with-treatment"]).as_slice()
    );
}

#[test]
fn test_completed_session_resolves_collected_tags() {
    let graph = QuizGraph::from_value(json!({
        "quiz_id": "mini",
        "title": "Mini",
        "questions": {
            "Q1": {"type": "single_choice", "text": "Who?", "options": [
                {"id": "self", "text": "Me", "next": "Q2", "tags": ["audience:self"]}
            ]},
            "Q2": {"type": "single_choice", "text": "Where?", "options": [
                {"id": "crisis", "text": "Crisis", "next": "RESULTS", "tags": ["stage:crisis"]}
            ]}
        }
    }))
    .unwrap();

    let mut engine = TraversalEngine::start(Arc::new(graph)).unwrap();
    engine.select_option("self").unwrap();
    engine.select_option("crisis").unwrap();

    let filter = TagResolver::new(reference_mapping()).resolve(engine.collected_tags());
    assert_eq!(
        filter,
        ResolvedFilter::from_pairs([
            ("resource_category", vec!["help-with-treatment"]),
            (
                "resource_tags",
                vec!["for-people-in-recovery", "interventions", "treatment"]
            ),
        ])
    );
}
