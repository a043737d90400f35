use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::resolver::DEFAULT_TAXONOMIES;
use crate::results::{ResultLimit, DEFAULT_RESULT_LIMIT};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub quizzes: QuizSourceConfig,
    pub database: DatabaseConfig,
    pub mapping: MappingConfig,
    pub results: ResultsConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
}

/// Quiz definition file configuration
#[derive(Debug, Clone)]
pub struct QuizSourceConfig {
    /// Directory holding `<quiz_id>.json` files
    pub dir: PathBuf,
    /// Quiz served when a requested id has no valid definition
    pub default_quiz_id: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Tag mapping configuration
#[derive(Debug, Clone)]
pub struct MappingConfig {
    pub path: PathBuf,
    /// Taxonomies seeded into every resolved filter, in order
    pub default_taxonomies: Vec<String>,
}

/// Results query configuration
#[derive(Debug, Clone, Default)]
pub struct ResultsConfig {
    pub limit: ResultLimit,
}

/// Session tracking configuration
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Events are only sent when an endpoint is set
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let default_quiz_id =
            env::var("DEFAULT_QUIZ_ID").unwrap_or_else(|_| "default".to_string());
        if default_quiz_id.trim().is_empty() {
            return Err(AppError::Config {
                message: "DEFAULT_QUIZ_ID must not be empty".to_string(),
            });
        }

        let quizzes = QuizSourceConfig {
            dir: PathBuf::from(env::var("QUIZ_DIR").unwrap_or_else(|_| "./quizzes".to_string())),
            default_quiz_id: default_quiz_id.trim().to_string(),
        };

        let database = DatabaseConfig {
            enabled: env::var("QUIZ_DATABASE_ENABLED")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(false),
            path: PathBuf::from(
                env::var("QUIZ_DATABASE_PATH").unwrap_or_else(|_| "./data/quizzes.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let default_taxonomies = env::var("DEFAULT_TAXONOMIES")
            .map(|s| parse_list(&s))
            .unwrap_or_default();
        let mapping = MappingConfig {
            path: PathBuf::from(
                env::var("TAG_MAPPING_PATH")
                    .unwrap_or_else(|_| "./quizzes/tag-mapping.json".to_string()),
            ),
            default_taxonomies: if default_taxonomies.is_empty() {
                DEFAULT_TAXONOMIES.iter().map(|t| t.to_string()).collect()
            } else {
                default_taxonomies
            },
        };

        let results = ResultsConfig {
            limit: ResultLimit::new(
                env::var("RESULT_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RESULT_LIMIT),
            ),
        };

        let tracking = TrackingConfig {
            endpoint: env::var("TRACKING_ENDPOINT")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            timeout_ms: env::var("TRACKING_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            quizzes,
            database,
            mapping,
            results,
            tracking,
            logging,
        })
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
