//! Composition root wiring sources, resolver and tracking together.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::TraversalEngine;
use crate::error::{AppError, AppResult, TraversalError};
use crate::resolver::{ResolvedFilter, TagResolver};
use crate::results::ResultsQuery;
use crate::source::{load_tag_mapping, JsonDirSource, QuizCatalog, SqliteQuizSource};
use crate::tracking::{HttpNotifier, NoopNotifier, SessionNotifier};

/// Starts quiz sessions and turns finished ones into results queries.
pub struct QuizService {
    config: Config,
    catalog: QuizCatalog,
    resolver: TagResolver,
    notifier: Arc<dyn SessionNotifier>,
    store: Option<SqliteQuizSource>,
}

impl QuizService {
    /// Assemble a service from prepared parts.
    pub fn new(
        config: Config,
        catalog: QuizCatalog,
        resolver: TagResolver,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        Self {
            config,
            catalog,
            resolver,
            notifier,
            store: None,
        }
    }

    /// Use a database as the target of [`QuizService::save_quiz`].
    pub fn with_store(mut self, store: SqliteQuizSource) -> Self {
        self.store = Some(store);
        self
    }

    /// Build everything the configuration describes.
    ///
    /// The database source, when enabled, is consulted before the JSON
    /// directory. Tracking is only wired when an endpoint is configured.
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let mut catalog = QuizCatalog::new(config.quizzes.default_quiz_id.clone());
        let store = if config.database.enabled {
            let database = SqliteQuizSource::new(&config.database).await?;
            catalog = catalog.with_source(database.clone());
            Some(database)
        } else {
            None
        };
        catalog = catalog.with_source(JsonDirSource::new(config.quizzes.dir.clone()));

        let mapping = load_tag_mapping(&config.mapping.path).await?;
        let resolver = TagResolver::new(mapping)
            .with_default_taxonomies(config.mapping.default_taxonomies.iter().cloned());

        let notifier: Arc<dyn SessionNotifier> = match HttpNotifier::from_config(&config.tracking)? {
            Some(http) => Arc::new(http),
            None => Arc::new(NoopNotifier),
        };

        info!(
            sources = ?catalog.source_names(),
            default_quiz_id = %catalog.default_quiz_id(),
            mapping_entries = resolver.mapping().len(),
            tracking = config.tracking.endpoint.is_some(),
            "Quiz service ready"
        );

        let service = Self::new(config, catalog, resolver, notifier);
        Ok(match store {
            Some(store) => service.with_store(store),
            None => service,
        })
    }

    /// Store a quiz definition and drop any cached graph for it.
    ///
    /// Sessions already running keep the graph they started with.
    ///
    /// # Errors
    /// - `AppError::Config` when no database is configured
    /// - `AppError::Validation` when the document is not a valid quiz
    pub async fn save_quiz(&self, raw: &Value) -> AppResult<()> {
        let store = self.store.as_ref().ok_or_else(|| AppError::Config {
            message: "No quiz database configured".to_string(),
        })?;

        store.save_quiz(raw).await?;

        if let Some(quiz_id) = raw.get("quiz_id").and_then(Value::as_str) {
            self.catalog.invalidate(quiz_id).await;
        }
        Ok(())
    }

    /// Remove a stored quiz and drop any cached graph for it.
    ///
    /// # Errors
    /// `AppError::Config` when no database is configured.
    pub async fn delete_quiz(&self, quiz_id: &str) -> AppResult<bool> {
        let store = self.store.as_ref().ok_or_else(|| AppError::Config {
            message: "No quiz database configured".to_string(),
        })?;

        let existed = store.delete_quiz(quiz_id).await?;
        self.catalog.invalidate(quiz_id).await;
        Ok(existed)
    }

    /// Start a session on a quiz (or the default quiz when it has no valid
    /// definition).
    ///
    /// # Errors
    /// `AppError::QuizNotFound` when neither exists.
    pub async fn start_session(&self, quiz_id: &str) -> AppResult<TraversalEngine> {
        let graph = self
            .catalog
            .load(quiz_id)
            .await?
            .ok_or_else(|| AppError::QuizNotFound {
                quiz_id: quiz_id.to_string(),
            })?;

        Ok(TraversalEngine::start_with_notifier(
            graph,
            Arc::clone(&self.notifier),
        )?)
    }

    /// Results query for a finished session.
    ///
    /// # Errors
    /// `NotTerminal` while the session is still in progress.
    pub fn results_for(&self, engine: &TraversalEngine) -> AppResult<ResultsQuery> {
        if !engine.is_terminal() {
            return Err(TraversalError::NotTerminal.into());
        }

        let filter = self.resolver.resolve(engine.collected_tags());
        if filter.is_empty() {
            warn!(
                session_id = %engine.session_id(),
                tags = engine.collected_tags().len(),
                "Completed session resolved to an empty filter"
            );
        }

        Ok(ResultsQuery::from_filter(filter, self.config.results.limit))
    }

    /// Resolve tags without a session.
    pub fn resolve(&self, tags: &[String]) -> ResolvedFilter {
        self.resolver.resolve(tags)
    }

    /// Quiz catalog.
    pub fn catalog(&self) -> &QuizCatalog {
        &self.catalog
    }

    /// Tag resolver.
    pub fn resolver(&self) -> &TagResolver {
        &self.resolver
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
