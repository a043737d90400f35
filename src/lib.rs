//! # Quiz Flow Engine
//!
//! Branching quiz traversal with tag-based resource filtering.
//!
//! A quiz is a graph of questions whose options point at the next question
//! or at the `RESULTS` sentinel. Each option carries tags; a finished session
//! resolves its collected tags through a tag mapping into a taxonomy filter
//! for a downstream resource search.
//!
//! ## Features
//!
//! - **Validation**: structural checks on raw quiz definitions, all issues at once
//! - **Traversal**: per-session state machine with back navigation and restart
//! - **Conditional options**: options gated on collected tags, path or weighted scores
//! - **Tag resolution**: exact and `prefix:*` mapping lookup into ordered, deduplicated buckets
//! - **Sources**: JSON files and SQLite, cached and validated through a catalog
//! - **Tracking**: fire-and-forget session events over HTTP
//!
//! ## Architecture
//!
//! ```text
//! QuizSource (SQLite, JSON dir) → QuizCatalog → QuizGraph
//!                                                  ↓
//!              SessionNotifier ← TraversalEngine (per session)
//!                                                  ↓ collected tags
//!                               TagResolver → ResultsQuery
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use quiz_flow_engine::{Config, QuizService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     quiz_flow_engine::logging::init_logging(&config.logging);
//!
//!     let service = QuizService::from_config(config).await?;
//!     let mut session = service.start_session("intake").await?;
//!     session.select_option("self")?;
//!     session.select_option("crisis")?;
//!
//!     let query = service.results_for(&session)?;
//!     println!("{}", serde_json::to_string(&query)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Option conditions and their evaluation.
pub mod conditions;
/// Configuration loaded from the environment.
pub mod config;
/// Per-session traversal state machine.
pub mod engine;
/// Error types and result aliases for the application.
pub mod error;
/// Quiz definitions, graph access and validation.
pub mod graph;
/// Tracing subscriber setup.
pub mod logging;
/// Tag-to-taxonomy resolution.
pub mod resolver;
/// Downstream results query.
pub mod results;
/// Service wiring sources, resolver and tracking.
pub mod service;
/// Quiz definition and tag mapping sources.
pub mod source;
/// Session event notification.
pub mod tracking;

pub use config::Config;
pub use engine::{Advance, PathStep, Retreat, TraversalEngine, TraversalState, TraversalStatus};
pub use error::{AppError, AppResult};
pub use graph::{QuizDefinition, QuizGraph};
pub use resolver::{ResolvedFilter, TagFilterMapping, TagResolver};
pub use results::ResultsQuery;
pub use service::QuizService;
