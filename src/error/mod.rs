use thiserror::Error;

use crate::graph::ValidationReport;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Quiz source error: {0}")]
    Source(#[from] SourceError),

    #[error("Quiz validation failed:\n{0}")]
    Validation(ValidationReport),

    #[error("Quiz not found: {quiz_id}")]
    QuizNotFound { quiz_id: String },

    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// A single structural problem found while validating a quiz definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Quiz ID is required")]
    MissingQuizId,

    #[error("Quiz title is required")]
    MissingTitle,

    #[error("Starting question {start_node_id} is required")]
    MissingStartNode { start_node_id: String },

    #[error("Question {node_id}: {reason}")]
    InvalidQuestion { node_id: String, reason: String },

    #[error("Question {node_id}, Option {option_index}: {reason}")]
    InvalidOption {
        node_id: String,
        option_index: usize,
        reason: String,
    },

    #[error("Quiz definition is malformed: {message}")]
    Malformed { message: String },
}

/// Runtime traversal errors; every one of these leaves the engine usable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraversalError {
    #[error("Quiz graph is invalid:\n{0}")]
    InvalidGraph(ValidationReport),

    #[error("Option {option_id} not found on question {node_id}")]
    OptionNotFound { node_id: String, option_id: String },

    #[error("Option {option_id} on question {node_id} is not available on this path")]
    OptionUnavailable { node_id: String, option_id: String },

    #[error("Question {node_id} not found")]
    NodeNotFound { node_id: String },

    #[error("Quiz already reached its results")]
    AlreadyTerminal,

    #[error("Navigation halted at {node_id}; go back or restart")]
    NavigationHalted { node_id: String },

    #[error("Quiz has not reached its results yet")]
    NotTerminal,
}

/// Quiz definition and tag mapping source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {origin}: {message}")]
    InvalidJson { origin: String, message: String },

    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Session tracking sink errors
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Tracking endpoint rejected event: {status}")]
    Rejected { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A tag mapping entry skipped during resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingIssue {
    #[error("Mapping for '{key}' is not an object")]
    FragmentNotMapping { key: String },

    #[error("Mapping for '{key}', taxonomy '{taxonomy}': terms must be an array")]
    TermsNotSequence { key: String, taxonomy: String },

    #[error("Mapping for '{key}', taxonomy '{taxonomy}': term at {index} is not a string")]
    TermNotString {
        key: String,
        taxonomy: String,
        index: usize,
    },
}

impl From<ValidationReport> for AppError {
    fn from(report: ValidationReport) -> Self {
        AppError::Validation(report)
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type alias for traversal operations
pub type TraversalResult<T> = Result<T, TraversalError>;

/// Result type alias for tracking operations
pub type TrackingResult<T> = Result<T, TrackingError>;
