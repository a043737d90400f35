use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{QuizSource, QuizSummary};
use crate::error::{AppError, AppResult, SourceError};
use crate::graph::{QuizGraph, ValidationReport};

/// Validated quiz graphs by id, loaded from ordered sources.
///
/// Sources are consulted in the order they were added; the first document
/// that validates wins. A quiz with no valid definition is replaced by the
/// default quiz when one exists. Invalid definitions are never returned.
pub struct QuizCatalog {
    sources: Vec<Box<dyn QuizSource>>,
    default_quiz_id: String,
    cache: RwLock<HashMap<String, Arc<QuizGraph>>>,
}

enum Lookup {
    Found(Arc<QuizGraph>),
    Invalid(ValidationReport),
    Failed(SourceError),
    Missing,
}

impl QuizCatalog {
    /// An empty catalog falling back to `default_quiz_id`.
    pub fn new(default_quiz_id: impl Into<String>) -> Self {
        Self {
            sources: Vec::new(),
            default_quiz_id: default_quiz_id.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Append a source after those already added.
    pub fn with_source(mut self, source: impl QuizSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Fallback quiz id.
    pub fn default_quiz_id(&self) -> &str {
        &self.default_quiz_id
    }

    /// Names of the sources, in lookup order.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Load a validated quiz graph.
    ///
    /// # Errors
    /// - `AppError::Validation` when only invalid definitions exist
    /// - `AppError::Source` when a source failed and nothing valid was found
    pub async fn load(&self, quiz_id: &str) -> AppResult<Option<Arc<QuizGraph>>> {
        if let Some(graph) = self.cached(quiz_id).await {
            return Ok(Some(graph));
        }

        let primary = self.lookup(quiz_id).await;
        if let Lookup::Found(graph) = primary {
            self.remember(quiz_id, &graph).await;
            return Ok(Some(graph));
        }

        let outcome = if quiz_id != self.default_quiz_id {
            let fallback = match self.cached(&self.default_quiz_id).await {
                Some(graph) => Lookup::Found(graph),
                None => self.lookup(&self.default_quiz_id).await,
            };
            if let Lookup::Found(graph) = fallback {
                info!(
                    quiz_id = %quiz_id,
                    default_quiz_id = %self.default_quiz_id,
                    "Quiz unavailable, serving default quiz"
                );
                self.remember(&self.default_quiz_id, &graph).await;
                return Ok(Some(graph));
            }
            match primary {
                Lookup::Missing => fallback,
                other => other,
            }
        } else {
            primary
        };

        match outcome {
            Lookup::Found(graph) => Ok(Some(graph)),
            Lookup::Invalid(report) => Err(AppError::Validation(report)),
            Lookup::Failed(e) => Err(AppError::Source(e)),
            Lookup::Missing => Ok(None),
        }
    }

    /// Drop a cached quiz; returns whether it was cached.
    pub async fn invalidate(&self, quiz_id: &str) -> bool {
        self.cache.write().await.remove(quiz_id).is_some()
    }

    /// Drop every cached quiz.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached quizzes.
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Quizzes across all sources, sorted by id.
    ///
    /// When several sources hold the same id, the earliest source is listed.
    /// A failing source is logged and skipped.
    pub async fn list(&self) -> Vec<QuizSummary> {
        let mut merged: HashMap<String, QuizSummary> = HashMap::new();
        for source in &self.sources {
            match source.list_quizzes().await {
                Ok(summaries) => {
                    for summary in summaries {
                        merged.entry(summary.quiz_id.clone()).or_insert(summary);
                    }
                }
                Err(e) => warn!(source = source.name(), error = %e, "Failed to list quizzes"),
            }
        }

        let mut listed: Vec<QuizSummary> = merged.into_values().collect();
        listed.sort_by(|a, b| a.quiz_id.cmp(&b.quiz_id));
        listed
    }

    async fn cached(&self, quiz_id: &str) -> Option<Arc<QuizGraph>> {
        self.cache.read().await.get(quiz_id).cloned()
    }

    async fn remember(&self, quiz_id: &str, graph: &Arc<QuizGraph>) {
        self.cache
            .write()
            .await
            .insert(quiz_id.to_string(), Arc::clone(graph));
    }

    async fn lookup(&self, quiz_id: &str) -> Lookup {
        let mut invalid: Option<ValidationReport> = None;
        let mut failure: Option<SourceError> = None;

        for source in &self.sources {
            let raw = match source.load_raw(quiz_id).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        quiz_id = %quiz_id,
                        source = source.name(),
                        error = %e,
                        "Quiz source failed"
                    );
                    failure.get_or_insert(e);
                    continue;
                }
            };

            match QuizGraph::from_value(raw) {
                Ok(graph) => {
                    if graph.quiz_id() != quiz_id {
                        debug!(
                            quiz_id = %quiz_id,
                            declared = %graph.quiz_id(),
                            "Quiz document declares a different id"
                        );
                    }
                    info!(
                        quiz_id = %quiz_id,
                        source = source.name(),
                        questions = graph.node_count(),
                        "Loaded quiz"
                    );
                    return Lookup::Found(Arc::new(graph));
                }
                Err(report) => {
                    warn!(
                        quiz_id = %quiz_id,
                        source = source.name(),
                        report = %report,
                        "Quiz validation failed"
                    );
                    invalid.get_or_insert(report);
                }
            }
        }

        match (invalid, failure) {
            (Some(report), _) => Lookup::Invalid(report),
            (None, Some(e)) => Lookup::Failed(e),
            (None, None) => Lookup::Missing,
        }
    }
}
