//! Conditional edges: predicates over the current path and collected tags.
//!
//! Conditions are parsed tolerantly. A condition with no `type` always holds,
//! and so does one whose `type` is not recognized. A recognized kind with a
//! malformed payload fails closed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::engine::PathStep;

/// Everything a condition may inspect.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Steps taken so far.
    pub path: &'a [PathStep],
    /// Tags collected so far, duplicates included.
    pub tags: &'a [String],
}

impl<'a> ConditionContext<'a> {
    /// Create a context over a path and its tags.
    pub fn new(path: &'a [PathStep], tags: &'a [String]) -> Self {
        Self { path, tags }
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Weighted tag score compared against a threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRule {
    /// Value the score is compared against.
    pub threshold: i64,
    /// Points contributed by each tag when present.
    pub score_tags: BTreeMap<String, i64>,
}

impl ScoreRule {
    /// Sum the weights of every scored tag present in the context,
    /// saturating at the `i64` bounds.
    pub fn score(&self, ctx: &ConditionContext<'_>) -> i64 {
        self.score_tags
            .iter()
            .filter(|(tag, _)| ctx.has_tag(tag))
            .fold(0i64, |acc, (_, points)| acc.saturating_add(*points))
    }
}

/// A predicate gating an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Condition {
    /// No `type` given
    Always,
    /// A single tag was collected
    HasTag(String),
    /// Every listed tag was collected
    HasTagsAll(Vec<String>),
    /// At least one listed tag was collected
    HasTagsAny(Vec<String>),
    /// The path visited the given node
    PathContains(String),
    /// Tag score is at least the threshold
    ScoreGte(ScoreRule),
    /// Tag score is at most the threshold
    ScoreLte(ScoreRule),
    /// Unrecognized kind; holds
    Unknown {
        /// The authored `type`
        kind: String,
        /// Original payload
        raw: Value,
    },
    /// Recognized kind with an unusable payload; never holds
    Malformed {
        /// The authored `type`
        kind: String,
        /// Original payload
        raw: Value,
    },
}

/// Integer coercion for authored numbers: ints, truncated floats, numeric strings.
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

impl Condition {
    /// Parse an authored condition object. Never fails.
    pub fn from_value(raw: &Value) -> Self {
        let Some(kind) = raw.get("type").and_then(Value::as_str) else {
            return Condition::Always;
        };

        let malformed = || Condition::Malformed {
            kind: kind.to_string(),
            raw: raw.clone(),
        };

        match kind {
            "has_tag" => Condition::HasTag(
                raw.get("tag")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            "has_tags_all" => match raw.get("tags").and_then(Value::as_array) {
                Some(tags) if tags.iter().all(Value::is_string) => Condition::HasTagsAll(
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                ),
                _ => malformed(),
            },
            "has_tags_any" => match raw.get("tags").and_then(Value::as_array) {
                Some(tags) => Condition::HasTagsAny(
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                ),
                None => malformed(),
            },
            "path_contains" => Condition::PathContains(
                raw.get("node_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            "score_gte" | "score_lte" => {
                // a list has no tag keys and scores nothing
                let score_tags = match raw.get("score_tags") {
                    None | Some(Value::Null) | Some(Value::Array(_)) => BTreeMap::new(),
                    Some(Value::Object(weights)) => weights
                        .iter()
                        .map(|(tag, points)| (tag.clone(), as_int(points).unwrap_or(0)))
                        .collect(),
                    Some(_) => return malformed(),
                };
                let rule = ScoreRule {
                    threshold: raw.get("threshold").and_then(as_int).unwrap_or(0),
                    score_tags,
                };
                if kind == "score_gte" {
                    Condition::ScoreGte(rule)
                } else {
                    Condition::ScoreLte(rule)
                }
            }
            _ => Condition::Unknown {
                kind: kind.to_string(),
                raw: raw.clone(),
            },
        }
    }

    /// Evaluate against the current path and tags.
    pub fn evaluate(&self, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Condition::Always => true,
            Condition::HasTag(tag) => ctx.has_tag(tag),
            Condition::HasTagsAll(tags) => tags.iter().all(|t| ctx.has_tag(t)),
            Condition::HasTagsAny(tags) => tags.iter().any(|t| ctx.has_tag(t)),
            Condition::PathContains(node_id) => {
                !node_id.is_empty() && ctx.path.iter().any(|step| &step.node_id == node_id)
            }
            Condition::ScoreGte(rule) => rule.score(ctx) >= rule.threshold,
            Condition::ScoreLte(rule) => rule.score(ctx) <= rule.threshold,
            Condition::Unknown { kind, .. } => {
                debug!(kind = %kind, "Unknown condition type, allowing");
                true
            }
            Condition::Malformed { .. } => false,
        }
    }
}

impl From<Value> for Condition {
    fn from(raw: Value) -> Self {
        Condition::from_value(&raw)
    }
}

impl From<Condition> for Value {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Always => json!({}),
            Condition::HasTag(tag) => json!({"type": "has_tag", "tag": tag}),
            Condition::HasTagsAll(tags) => json!({"type": "has_tags_all", "tags": tags}),
            Condition::HasTagsAny(tags) => json!({"type": "has_tags_any", "tags": tags}),
            Condition::PathContains(node_id) => {
                json!({"type": "path_contains", "node_id": node_id})
            }
            Condition::ScoreGte(rule) => json!({
                "type": "score_gte",
                "threshold": rule.threshold,
                "score_tags": rule.score_tags,
            }),
            Condition::ScoreLte(rule) => json!({
                "type": "score_lte",
                "threshold": rule.threshold,
                "score_tags": rule.score_tags,
            }),
            Condition::Unknown { raw, .. } | Condition::Malformed { raw, .. } => raw,
        }
    }
}
