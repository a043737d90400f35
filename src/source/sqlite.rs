use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::{QuizSource, QuizSummary};
use crate::config::DatabaseConfig;
use crate::error::{AppResult, SourceError, SourceResult};
use crate::graph::QuizGraph;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed quiz definitions
#[derive(Clone)]
pub struct SqliteQuizSource {
    pool: SqlitePool,
}

impl SqliteQuizSource {
    /// Open (creating if needed) the quiz database and run migrations
    pub async fn new(config: &DatabaseConfig) -> SourceResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SourceError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| SourceError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| SourceError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let source = Self { pool };
        source.run_migrations().await?;

        Ok(source)
    }

    async fn run_migrations(&self) -> SourceResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| SourceError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a quiz definition.
    ///
    /// A [`QuizCatalog`](super::QuizCatalog) reading this database keeps its
    /// cached graph until invalidated; `QuizService::save_quiz` does both.
    ///
    /// # Errors
    /// `AppError::Validation` when the document is not a valid quiz; nothing
    /// is written.
    pub async fn save_quiz(&self, raw: &Value) -> AppResult<()> {
        let graph = QuizGraph::from_value(raw.clone())?;
        let definition = graph.definition();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO quizzes (quiz_id, title, version, description, structure, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(quiz_id) DO UPDATE SET
                title = excluded.title,
                version = excluded.version,
                description = excluded.description,
                structure = excluded.structure,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&definition.quiz_id)
        .bind(&definition.title)
        .bind(&definition.version)
        .bind(&definition.description)
        .bind(raw.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(SourceError::from)?;

        info!(quiz_id = %definition.quiz_id, "Saved quiz definition");
        Ok(())
    }

    /// Remove a quiz; returns whether it existed.
    pub async fn delete_quiz(&self, quiz_id: &str) -> SourceResult<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE quiz_id = ?")
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl QuizSource for SqliteQuizSource {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load_raw(&self, quiz_id: &str) -> SourceResult<Option<Value>> {
        let row: Option<QuizRow> = sqlx::query_as(
            r#"
            SELECT quiz_id, title, version, description, structure
            FROM quizzes
            WHERE quiz_id = ?
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuizRow::into_document).transpose()
    }

    async fn list_quizzes(&self) -> SourceResult<Vec<QuizSummary>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT quiz_id, title, version FROM quizzes ORDER BY quiz_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(quiz_id, title, version)| QuizSummary {
                quiz_id,
                title,
                version,
                source: self.name().to_string(),
            })
            .collect())
    }
}

// Internal row type for SQLx mapping
#[derive(sqlx::FromRow)]
struct QuizRow {
    quiz_id: String,
    title: String,
    version: String,
    description: Option<String>,
    structure: String,
}

impl QuizRow {
    /// Parse the stored structure, filling header fields it lacks from the row.
    fn into_document(self) -> SourceResult<Value> {
        let mut document: Value =
            serde_json::from_str(&self.structure).map_err(|e| SourceError::InvalidJson {
                origin: format!("stored quiz {}", self.quiz_id),
                message: e.to_string(),
            })?;

        if let Some(object) = document.as_object_mut() {
            object
                .entry("quiz_id")
                .or_insert_with(|| Value::String(self.quiz_id.clone()));
            object
                .entry("title")
                .or_insert_with(|| Value::String(self.title.clone()));
            object
                .entry("version")
                .or_insert_with(|| Value::String(self.version.clone()));
            if let Some(description) = self.description {
                object
                    .entry("description")
                    .or_insert(Value::String(description));
            }
        }

        Ok(document)
    }
}
