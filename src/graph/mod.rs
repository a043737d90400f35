//! Quiz graph: the structural model of a branching questionnaire.
//!
//! A quiz is a set of question nodes keyed by id. Each question offers one or
//! more options; every option names the next question to visit, or the
//! [`RESULTS`] sentinel that ends the quiz. Graphs are immutable once built and
//! can be shared read-only across any number of sessions.

mod validate;

pub use validate::{validate_value, ValidationReport};

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::conditions::Condition;

/// Sentinel `next` value that ends the quiz.
pub const RESULTS: &str = "RESULTS";

/// Start node used when a definition does not name one.
pub const DEFAULT_START_NODE: &str = "Q1";

fn default_start_node() -> String {
    DEFAULT_START_NODE.to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A complete quiz definition as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDefinition {
    /// Unique quiz identifier.
    pub quiz_id: String,
    /// Human-readable title.
    pub title: String,
    /// Optional long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Authoring version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Node the traversal starts at.
    #[serde(rename = "start_node", default = "default_start_node")]
    pub start_node_id: String,
    /// Questions keyed by node id.
    #[serde(rename = "questions")]
    pub nodes: HashMap<String, QuestionNode>,
}

/// One question in the quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionNode {
    /// Node id, taken from the key in [`QuizDefinition::nodes`].
    #[serde(default, skip_serializing)]
    pub id: String,
    /// Question kind (e.g. "single_choice").
    #[serde(rename = "type")]
    pub question_type: String,
    /// Prompt shown to the user.
    #[serde(rename = "text")]
    pub prompt_text: String,
    /// Optional secondary line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Selectable answers, in display order.
    pub options: Vec<OptionEdge>,
}

impl QuestionNode {
    /// Find an option by id.
    pub fn option(&self, option_id: &str) -> Option<&OptionEdge> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// One selectable answer and the edge it follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEdge {
    /// Option id, unique within its question.
    pub id: String,
    /// Answer text.
    pub text: String,
    /// Next node id, or [`RESULTS`].
    pub next: String,
    /// Tags collected when this option is chosen.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Styling hint; ignored by traversal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Predicate gating this option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl OptionEdge {
    /// Create an option with no tags, priority or condition.
    pub fn new(id: impl Into<String>, text: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            next: next.into(),
            tags: Vec::new(),
            priority: None,
            condition: None,
        }
    }

    /// Set the collected tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the styling hint.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Gate this option behind a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Whether choosing this option ends the quiz.
    pub fn is_terminal(&self) -> bool {
        self.next == RESULTS
    }
}

/// UI emphasis hint for an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Highlighted answer
    High,
    /// Default emphasis
    Medium,
    /// De-emphasized answer
    Low,
    /// Any other authored hint, passed through untouched
    #[serde(untagged)]
    Other(String),
}

/// A validated-shape quiz graph with O(1) node lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizGraph {
    definition: QuizDefinition,
}

impl QuizGraph {
    /// Index a typed definition. Does not validate; see [`QuizGraph::validate`].
    pub fn new(mut definition: QuizDefinition) -> Self {
        for (id, node) in definition.nodes.iter_mut() {
            node.id = id.clone();
        }
        Self { definition }
    }

    /// Validate a raw JSON document and build a graph from it.
    ///
    /// Every structural problem is reported at once; the graph is only built
    /// when the report is clean.
    pub fn from_value(raw: serde_json::Value) -> Result<Self, ValidationReport> {
        let report = validate_value(&raw);
        if !report.is_valid() {
            return Err(report);
        }

        let definition: QuizDefinition = serde_json::from_value(raw).map_err(|e| {
            ValidationReport::from_issues(vec![crate::error::ValidationIssue::Malformed {
                message: e.to_string(),
            }])
        })?;

        Ok(Self::new(definition))
    }

    /// Re-run the structural checks over the typed definition.
    pub fn validate(&self) -> ValidationReport {
        validate::validate_definition(&self.definition)
    }

    /// Look up a node; `None` rather than an error for tolerant callers.
    pub fn get_node(&self, node_id: &str) -> Option<&QuestionNode> {
        self.definition.nodes.get(node_id)
    }

    /// Whether a node with this id exists.
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.definition.nodes.contains_key(node_id)
    }

    /// The node traversal starts at.
    pub fn start_node_id(&self) -> &str {
        &self.definition.start_node_id
    }

    /// Quiz id.
    pub fn quiz_id(&self) -> &str {
        &self.definition.quiz_id
    }

    /// Quiz title.
    pub fn title(&self) -> &str {
        &self.definition.title
    }

    /// Number of questions.
    pub fn node_count(&self) -> usize {
        self.definition.nodes.len()
    }

    /// The underlying definition.
    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }
}
