//! Where quiz definitions and tag mappings come from.
//!
//! Sources hand back raw JSON documents. Validation happens in the
//! [`QuizCatalog`], which decides which document wins.

mod catalog;
mod json;
mod mapping;
mod sqlite;

pub use catalog::QuizCatalog;
pub use json::JsonDirSource;
pub use mapping::load_tag_mapping;
pub use sqlite::SqliteQuizSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SourceResult;

/// Listing entry for a stored quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    /// Quiz identifier.
    pub quiz_id: String,
    /// Display title.
    pub title: String,
    /// Definition version.
    pub version: String,
    /// Name of the source holding it.
    pub source: String,
}

/// A store of raw quiz definitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// Short name used in logs and listings.
    fn name(&self) -> &'static str;

    /// Raw definition for a quiz id, `None` when this source has none.
    async fn load_raw(&self, quiz_id: &str) -> SourceResult<Option<Value>>;

    /// Quizzes this source holds.
    async fn list_quizzes(&self) -> SourceResult<Vec<QuizSummary>>;
}

/// Restrict a quiz id to `[A-Za-z0-9_-]` so it is safe as a file stem.
pub fn sanitize_quiz_id(quiz_id: &str) -> String {
    quiz_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_quiz_id() {
        assert_eq!(sanitize_quiz_id("noma-quiz_2"), "noma-quiz_2");
        assert_eq!(sanitize_quiz_id("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_quiz_id("quiz id.json"), "quizidjson");
        assert_eq!(sanitize_quiz_id("..."), "");
    }
}
