use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::QuizGraph;

/// One answered question.
///
/// The option text is captured at selection time so a path stays readable
/// even if the quiz is edited later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Question answered.
    pub node_id: String,
    /// Option chosen.
    pub option_id: String,
    /// Option text when chosen.
    pub option_text: String,
}

/// Exportable session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalState {
    /// Question currently shown.
    pub current_node_id: String,
    /// Steps taken, oldest first.
    pub path: Vec<PathStep>,
    /// Tags in selection order, duplicates included.
    pub collected_tags: Vec<String>,
    /// Whether the results were reached.
    pub terminal: bool,
}

impl TraversalState {
    /// A fresh state at a start node.
    pub fn at_start(start_node_id: impl Into<String>) -> Self {
        Self {
            current_node_id: start_node_id.into(),
            path: Vec::new(),
            collected_tags: Vec::new(),
            terminal: false,
        }
    }
}

/// Engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStatus {
    /// Waiting for an answer.
    InProgress,
    /// Results reached.
    Terminal,
    /// Stuck on a missing question.
    Error,
}

impl TraversalStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalStatus::InProgress => "in_progress",
            TraversalStatus::Terminal => "terminal",
            TraversalStatus::Error => "error",
        }
    }
}

impl fmt::Display for TraversalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rebuild collected tags by replaying a path against a graph.
///
/// Steps whose question or option no longer exists contribute no tags.
pub fn replay_tags(graph: &QuizGraph, path: &[PathStep]) -> Vec<String> {
    path.iter()
        .filter_map(|step| graph.get_node(&step.node_id)?.option(&step.option_id))
        .flat_map(|option| option.tags.iter().cloned())
        .collect()
}
