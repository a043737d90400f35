use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{sanitize_quiz_id, QuizSource, QuizSummary};
use crate::error::{SourceError, SourceResult};

/// Quiz definitions stored as `<dir>/<quiz_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    /// Read definitions from a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a quiz id maps to, `None` when nothing of the id survives sanitizing.
    pub fn path_for(&self, quiz_id: &str) -> Option<PathBuf> {
        let stem = sanitize_quiz_id(quiz_id);
        if stem.is_empty() {
            return None;
        }
        Some(self.dir.join(format!("{}.json", stem)))
    }
}

#[async_trait]
impl QuizSource for JsonDirSource {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn load_raw(&self, quiz_id: &str) -> SourceResult<Option<Value>> {
        let Some(path) = self.path_for(quiz_id) else {
            debug!(quiz_id = %quiz_id, "Quiz id is empty after sanitizing");
            return Ok(None);
        };

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SourceError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        let raw = serde_json::from_str(&text).map_err(|e| SourceError::InvalidJson {
            origin: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(raw))
    }

    async fn list_quizzes(&self) -> SourceResult<Vec<QuizSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SourceError::Io {
                    path: self.dir.display().to_string(),
                    source: e,
                })
            }
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| SourceError::Io {
            path: self.dir.display().to_string(),
            source: e,
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            // Other JSON (the tag mapping, for one) may share the directory.
            let Ok(text) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(raw) = serde_json::from_str::<Value>(&text) else {
                debug!(path = %path.display(), "Skipping unparseable JSON file");
                continue;
            };
            let (Some(quiz_id), Some(title)) = (
                raw.get("quiz_id").and_then(Value::as_str),
                raw.get("title").and_then(Value::as_str),
            ) else {
                continue;
            };

            summaries.push(QuizSummary {
                quiz_id: quiz_id.to_string(),
                title: title.to_string(),
                version: raw
                    .get("version")
                    .and_then(Value::as_str)
                    .unwrap_or("1.0.0")
                    .to_string(),
                source: self.name().to_string(),
            });
        }

        summaries.sort_by(|a, b| a.quiz_id.cmp(&b.quiz_id));
        Ok(summaries)
    }
}
