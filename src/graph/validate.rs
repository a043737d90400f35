//! Structural validation of quiz definitions.
//!
//! Validation accumulates every issue instead of stopping at the first, so an
//! author sees the whole list in one pass. Dangling `next` targets are not
//! checked here; they surface at traversal time as `NodeNotFound`.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::{QuizDefinition, DEFAULT_START_NODE};
use crate::error::ValidationIssue;

/// Outcome of validating a quiz definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Build a report from a list of issues.
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// True when no issue was found.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues in the order they were found.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// All issues, one per line.
    pub fn message(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn question_issue(node_id: &str, reason: &str) -> ValidationIssue {
    ValidationIssue::InvalidQuestion {
        node_id: node_id.to_string(),
        reason: reason.to_string(),
    }
}

fn option_issue(node_id: &str, option_index: usize, reason: impl Into<String>) -> ValidationIssue {
    ValidationIssue::InvalidOption {
        node_id: node_id.to_string(),
        option_index,
        reason: reason.into(),
    }
}

/// Validate an untyped quiz document.
///
/// Checks run in a fixed order: quiz id, title, presence of the start node,
/// then every question (sorted by id) and every option within it.
pub fn validate_value(raw: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    if non_empty_str(raw.get("quiz_id")).is_none() {
        report.push(ValidationIssue::MissingQuizId);
    }

    if non_empty_str(raw.get("title")).is_none() {
        report.push(ValidationIssue::MissingTitle);
    }

    let start_node_id = non_empty_str(raw.get("start_node")).unwrap_or(DEFAULT_START_NODE);

    let Some(questions) = raw.get("questions").and_then(Value::as_object) else {
        report.push(ValidationIssue::MissingStartNode {
            start_node_id: start_node_id.to_string(),
        });
        return report;
    };

    if !questions.contains_key(start_node_id) {
        report.push(ValidationIssue::MissingStartNode {
            start_node_id: start_node_id.to_string(),
        });
    }

    for (node_id, question) in questions {
        validate_question_value(&mut report, node_id, question);
    }

    report
}

fn validate_question_value(report: &mut ValidationReport, node_id: &str, question: &Value) {
    if !question.is_object() {
        report.push(question_issue(node_id, "Must be an object"));
        return;
    }

    if non_empty_str(question.get("type")).is_none() {
        report.push(question_issue(node_id, "Type is required"));
    }

    if non_empty_str(question.get("text")).is_none() {
        report.push(question_issue(node_id, "Text is required"));
    }

    let Some(options) = question.get("options").and_then(Value::as_array) else {
        report.push(question_issue(
            node_id,
            "Options are required and must be an array",
        ));
        return;
    };

    if options.is_empty() {
        report.push(question_issue(node_id, "Must have at least one option"));
        return;
    }

    let mut seen = HashSet::new();
    for (index, option) in options.iter().enumerate() {
        if !option.is_object() {
            report.push(option_issue(node_id, index, "Must be an object"));
            continue;
        }

        match non_empty_str(option.get("id")) {
            Some(id) => {
                if !seen.insert(id) {
                    report.push(option_issue(node_id, index, format!("Duplicate option ID {}", id)));
                }
            }
            None => report.push(option_issue(node_id, index, "ID is required")),
        }

        if non_empty_str(option.get("text")).is_none() {
            report.push(option_issue(node_id, index, "Text is required"));
        }

        if non_empty_str(option.get("next")).is_none() {
            report.push(option_issue(node_id, index, "Next node is required"));
        }

        match option.get("tags") {
            None | Some(Value::Null) => {}
            Some(Value::Array(tags)) if tags.iter().all(Value::is_string) => {}
            Some(_) => report.push(option_issue(
                node_id,
                index,
                "Tags must be an array of strings",
            )),
        }
    }
}

/// Validate a typed definition with the same rules as [`validate_value`].
pub(crate) fn validate_definition(definition: &QuizDefinition) -> ValidationReport {
    let mut report = ValidationReport::default();

    if definition.quiz_id.is_empty() {
        report.push(ValidationIssue::MissingQuizId);
    }

    if definition.title.is_empty() {
        report.push(ValidationIssue::MissingTitle);
    }

    if !definition.nodes.contains_key(&definition.start_node_id) {
        report.push(ValidationIssue::MissingStartNode {
            start_node_id: definition.start_node_id.clone(),
        });
    }

    let mut node_ids: Vec<&String> = definition.nodes.keys().collect();
    node_ids.sort();

    for node_id in node_ids {
        let node = &definition.nodes[node_id];

        if node.question_type.is_empty() {
            report.push(question_issue(node_id, "Type is required"));
        }
        if node.prompt_text.is_empty() {
            report.push(question_issue(node_id, "Text is required"));
        }
        if node.options.is_empty() {
            report.push(question_issue(node_id, "Must have at least one option"));
            continue;
        }

        let mut seen = HashSet::new();
        for (index, option) in node.options.iter().enumerate() {
            if option.id.is_empty() {
                report.push(option_issue(node_id, index, "ID is required"));
            } else if !seen.insert(option.id.as_str()) {
                report.push(option_issue(
                    node_id,
                    index,
                    format!("Duplicate option ID {}", option.id),
                ));
            }
            if option.text.is_empty() {
                report.push(option_issue(node_id, index, "Text is required"));
            }
            if option.next.is_empty() {
                report.push(option_issue(node_id, index, "Next node is required"));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{OptionEdge, QuestionNode, QuizGraph};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_valid_document_has_no_issues() {
        let raw = json!({
            "quiz_id": "q",
            "title": "T",
            "questions": {
                "Q1": {"type": "single_choice", "text": "?", "options": [
                    {"id": "a", "text": "A", "next": "Q7"}
                ]}
            }
        });

        // dangling "Q7" is tolerated here
        let report = validate_value(&raw);
        assert!(report.is_valid(), "{}", report);
        assert_eq!(report.message(), "");
    }

    #[test]
    fn test_missing_start_node() {
        let raw = json!({
            "quiz_id": "q",
            "title": "T",
            "questions": {
                "Q2": {"type": "single_choice", "text": "?", "options": [
                    {"id": "a", "text": "A", "next": "RESULTS"}
                ]}
            }
        });

        let report = validate_value(&raw);
        assert_eq!(
            report.issues(),
            &[ValidationIssue::MissingStartNode {
                start_node_id: "Q1".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_questions_stops_early() {
        let report = validate_value(&json!({"quiz_id": "q", "title": "T", "questions": []}));
        assert_eq!(
            report.issues(),
            &[ValidationIssue::MissingStartNode {
                start_node_id: "Q1".to_string()
            }]
        );
    }

    #[test]
    fn test_accumulates_all_issues_in_order() {
        let raw = json!({
            "quiz_id": "",
            "questions": {
                "Q1": {"type": "single_choice", "options": [
                    {"id": "a", "text": "", "next": "RESULTS", "tags": "audience:self"},
                    "not-an-object",
                    {"id": "a", "text": "Again", "next": ""}
                ]},
                "Q2": {"text": "No type", "options": []},
                "Q3": 7
            }
        });

        let report = validate_value(&raw);
        assert_eq!(
            report.issues(),
            &[
                ValidationIssue::MissingQuizId,
                ValidationIssue::MissingTitle,
                question_issue("Q1", "Text is required"),
                option_issue("Q1", 0, "Text is required"),
                option_issue("Q1", 0, "Tags must be an array of strings"),
                option_issue("Q1", 1, "Must be an object"),
                option_issue("Q1", 2, "Duplicate option ID a"),
                option_issue("Q1", 2, "Next node is required"),
                question_issue("Q2", "Type is required"),
                question_issue("Q2", "Must have at least one option"),
                question_issue("Q3", "Must be an object"),
            ]
        );
    }

    #[test]
    fn test_non_string_tags_rejected() {
        let raw = json!({
            "quiz_id": "q",
            "title": "T",
            "questions": {
                "Q1": {"type": "single_choice", "text": "?", "options": [
                    {"id": "a", "text": "A", "next": "RESULTS", "tags": ["ok", 3]}
                ]}
            }
        });

        let report = validate_value(&raw);
        assert_eq!(
            report.issues(),
            &[option_issue("Q1", 0, "Tags must be an array of strings")]
        );
    }

    #[test]
    fn test_validate_definition_matches_raw_rules() {
        let definition = QuizDefinition {
            quiz_id: "q".to_string(),
            title: String::new(),
            description: None,
            version: "1.0.0".to_string(),
            start_node_id: "Q1".to_string(),
            nodes: HashMap::from([(
                "Q1".to_string(),
                QuestionNode {
                    id: String::new(),
                    question_type: "single_choice".to_string(),
                    prompt_text: "?".to_string(),
                    subtitle: None,
                    options: vec![
                        OptionEdge::new("a", "A", "RESULTS"),
                        OptionEdge::new("a", "B", ""),
                    ],
                },
            )]),
        };

        let report = QuizGraph::new(definition).validate();
        assert_eq!(
            report.issues(),
            &[
                ValidationIssue::MissingTitle,
                option_issue("Q1", 1, "Duplicate option ID a"),
                option_issue("Q1", 1, "Next node is required"),
            ]
        );
    }

    #[test]
    fn test_report_display_joins_lines() {
        let report = ValidationReport::from_issues(vec![
            ValidationIssue::MissingQuizId,
            ValidationIssue::MissingTitle,
        ]);
        assert_eq!(report.to_string(), "Quiz ID is required\nQuiz title is required");
    }
}
