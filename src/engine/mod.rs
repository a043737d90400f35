//! Traversal engine: the per-session state machine that walks a quiz graph.
//!
//! # States
//!
//! - **InProgress**: the current node is a real question
//! - **Terminal**: the last selected option led to `RESULTS`; only
//!   [`TraversalEngine::restart`] leaves this state
//! - **Error**: the last selected option pointed at a missing question; the
//!   answer was recorded, and [`TraversalEngine::retreat`] or
//!   [`TraversalEngine::restart`] recovers
//!
//! Every other failed operation leaves the state exactly as it was.

mod state;

pub use state::{replay_tags, PathStep, TraversalState, TraversalStatus};

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conditions::ConditionContext;
use crate::error::{TraversalError, TraversalResult};
use crate::graph::{OptionEdge, QuestionNode, QuizGraph};
use crate::tracking::{NoopNotifier, SessionEvent, SessionNotifier};

/// Denominator of [`TraversalEngine::progress_estimate`].
///
/// A fixed guess at path length, not the depth of the actual graph: long
/// paths clamp at 100% early and short ones finish below it.
pub const ESTIMATED_TOTAL_STEPS: usize = 3;

/// Outcome of a successful [`TraversalEngine::select_option`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to another question.
    Moved {
        /// The new current question.
        node_id: String,
    },
    /// Reached the results.
    Completed,
}

/// Outcome of a successful [`TraversalEngine::retreat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retreat {
    /// Undid the last answer.
    SteppedBack {
        /// The question now current again.
        node_id: String,
    },
    /// Nothing to undo.
    AtStart,
}

/// Drives one quiz session over a shared, read-only graph.
pub struct TraversalEngine {
    graph: Arc<QuizGraph>,
    state: TraversalState,
    status: TraversalStatus,
    session_id: String,
    notifier: Arc<dyn SessionNotifier>,
}

impl TraversalEngine {
    /// Start an untracked session.
    pub fn start(graph: Arc<QuizGraph>) -> TraversalResult<Self> {
        Self::start_with_notifier(graph, Arc::new(NoopNotifier))
    }

    /// Start a session at the graph's start node.
    ///
    /// # Errors
    /// `InvalidGraph` when the graph fails validation; nothing is started.
    pub fn start_with_notifier(
        graph: Arc<QuizGraph>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> TraversalResult<Self> {
        ensure_valid(&graph)?;

        let mut engine = Self {
            state: TraversalState::at_start(graph.start_node_id()),
            status: TraversalStatus::InProgress,
            session_id: Uuid::new_v4().to_string(),
            graph,
            notifier,
        };
        engine.announce_start();
        Ok(engine)
    }

    /// Rebuild an untracked session around a previously exported state.
    pub fn resume(graph: Arc<QuizGraph>, state: TraversalState) -> TraversalResult<Self> {
        Self::resume_with_notifier(
            graph,
            Uuid::new_v4().to_string(),
            state,
            Arc::new(NoopNotifier),
        )
    }

    /// Rebuild a session around a previously exported state.
    ///
    /// The state is taken as-is, even if the graph changed since it was
    /// exported. A state whose current question no longer exists resumes in
    /// the `Error` status. No event is emitted.
    pub fn resume_with_notifier(
        graph: Arc<QuizGraph>,
        session_id: impl Into<String>,
        state: TraversalState,
        notifier: Arc<dyn SessionNotifier>,
    ) -> TraversalResult<Self> {
        ensure_valid(&graph)?;

        let status = if state.terminal {
            TraversalStatus::Terminal
        } else if graph.contains_node(&state.current_node_id) {
            TraversalStatus::InProgress
        } else {
            TraversalStatus::Error
        };

        let session_id = session_id.into();
        debug!(
            quiz_id = %graph.quiz_id(),
            session_id = %session_id,
            status = %status,
            path_length = state.path.len(),
            "Resumed quiz session"
        );

        Ok(Self {
            graph,
            state,
            status,
            session_id,
            notifier,
        })
    }

    /// Answer the current question.
    ///
    /// On success the step is recorded, the option's tags are appended, and
    /// the engine moves to the option's `next` question or to the results.
    ///
    /// # Errors
    /// - `AlreadyTerminal` / `NavigationHalted` when not in progress
    /// - `OptionNotFound` when the current question has no such option
    /// - `OptionUnavailable` when the option's condition does not hold
    /// - `NodeNotFound` when `next` names a missing question; the step and
    ///   its tags stay recorded and the engine enters `Error`
    pub fn select_option(&mut self, option_id: &str) -> TraversalResult<Advance> {
        match self.status {
            TraversalStatus::Terminal => return Err(TraversalError::AlreadyTerminal),
            TraversalStatus::Error => {
                return Err(TraversalError::NavigationHalted {
                    node_id: self.state.current_node_id.clone(),
                })
            }
            TraversalStatus::InProgress => {}
        }

        let graph = Arc::clone(&self.graph);
        let node_id = self.state.current_node_id.clone();

        let node = graph
            .get_node(&node_id)
            .ok_or_else(|| TraversalError::NodeNotFound {
                node_id: node_id.clone(),
            })?;

        let Some(option) = node.option(option_id) else {
            debug!(node_id = %node_id, option_id = %option_id, "Option not found");
            return Err(TraversalError::OptionNotFound {
                node_id,
                option_id: option_id.to_string(),
            });
        };

        if !self.is_available(option) {
            debug!(node_id = %node_id, option_id = %option_id, "Option condition not met");
            return Err(TraversalError::OptionUnavailable {
                node_id,
                option_id: option_id.to_string(),
            });
        }

        self.state.path.push(PathStep {
            node_id: node_id.clone(),
            option_id: option.id.clone(),
            option_text: option.text.clone(),
        });
        self.state.collected_tags.extend(option.tags.iter().cloned());

        self.notifier.notify(SessionEvent::Answer {
            quiz_id: graph.quiz_id().to_string(),
            session_id: self.session_id.clone(),
            node_id: node_id.clone(),
            option_id: option.id.clone(),
            option_text: option.text.clone(),
            tags: option.tags.clone(),
            at: Utc::now(),
        });

        if option.is_terminal() {
            self.state.terminal = true;
            self.status = TraversalStatus::Terminal;

            info!(
                quiz_id = %graph.quiz_id(),
                session_id = %self.session_id,
                path_length = self.state.path.len(),
                tags = self.state.collected_tags.len(),
                "Quiz session completed"
            );
            self.notifier.notify(SessionEvent::Complete {
                quiz_id: graph.quiz_id().to_string(),
                session_id: self.session_id.clone(),
                collected_tags: self.state.collected_tags.clone(),
                path_length: self.state.path.len(),
                at: Utc::now(),
            });
            return Ok(Advance::Completed);
        }

        if !graph.contains_node(&option.next) {
            self.status = TraversalStatus::Error;
            warn!(
                quiz_id = %graph.quiz_id(),
                session_id = %self.session_id,
                node_id = %node_id,
                option_id = %option.id,
                next = %option.next,
                "Option points at a missing question"
            );
            return Err(TraversalError::NodeNotFound {
                node_id: option.next.clone(),
            });
        }

        self.state.current_node_id = option.next.clone();
        debug!(
            session_id = %self.session_id,
            from = %node_id,
            to = %option.next,
            "Advanced"
        );
        Ok(Advance::Moved {
            node_id: option.next.clone(),
        })
    }

    /// Undo the last answer.
    ///
    /// Tags are rebuilt by replaying the remaining path against the graph;
    /// steps that no longer resolve contribute nothing. Recovers from the
    /// `Error` status.
    ///
    /// # Errors
    /// `AlreadyTerminal` once the results were reached; use
    /// [`TraversalEngine::restart`].
    pub fn retreat(&mut self) -> TraversalResult<Retreat> {
        if self.status == TraversalStatus::Terminal {
            return Err(TraversalError::AlreadyTerminal);
        }

        if self.state.path.pop().is_none() {
            if self.status == TraversalStatus::Error {
                self.state.current_node_id = self.graph.start_node_id().to_string();
                self.status = TraversalStatus::InProgress;
            }
            return Ok(Retreat::AtStart);
        }

        self.state.current_node_id = match self.state.path.last() {
            Some(step) => step.node_id.clone(),
            None => self.graph.start_node_id().to_string(),
        };
        self.state.collected_tags = replay_tags(&self.graph, &self.state.path);
        self.status = TraversalStatus::InProgress;

        debug!(
            session_id = %self.session_id,
            node_id = %self.state.current_node_id,
            path_length = self.state.path.len(),
            "Stepped back"
        );
        Ok(Retreat::SteppedBack {
            node_id: self.state.current_node_id.clone(),
        })
    }

    /// Start over on the same graph, as a new session.
    pub fn restart(&mut self) -> TraversalResult<()> {
        ensure_valid(&self.graph)?;

        self.state = TraversalState::at_start(self.graph.start_node_id());
        self.status = TraversalStatus::InProgress;
        self.session_id = Uuid::new_v4().to_string();
        self.announce_start();
        Ok(())
    }

    /// Options on the current question whose conditions hold.
    pub fn available_options(&self) -> Vec<&OptionEdge> {
        match self.current_node() {
            Some(node) if self.status == TraversalStatus::InProgress => node
                .options
                .iter()
                .filter(|option| self.is_available(option))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Rough completion in [0, 1]; see [`ESTIMATED_TOTAL_STEPS`].
    pub fn progress_estimate(&self) -> f64 {
        (self.state.path.len() as f64 / ESTIMATED_TOTAL_STEPS as f64).min(1.0)
    }

    /// Whether the results were reached.
    pub fn is_terminal(&self) -> bool {
        self.status == TraversalStatus::Terminal
    }

    /// Current status.
    pub fn status(&self) -> TraversalStatus {
        self.status
    }

    /// The current question, if it exists.
    pub fn current_node(&self) -> Option<&QuestionNode> {
        self.graph.get_node(&self.state.current_node_id)
    }

    /// Id of the current question.
    pub fn current_node_id(&self) -> &str {
        &self.state.current_node_id
    }

    /// Steps taken so far.
    pub fn path(&self) -> &[PathStep] {
        &self.state.path
    }

    /// Tags collected so far, duplicates included.
    pub fn collected_tags(&self) -> &[String] {
        &self.state.collected_tags
    }

    /// Borrow the full state.
    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    /// Consume the engine, keeping its state for export.
    pub fn into_state(self) -> TraversalState {
        self.state
    }

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The graph being traversed.
    pub fn graph(&self) -> &Arc<QuizGraph> {
        &self.graph
    }

    fn is_available(&self, option: &OptionEdge) -> bool {
        option.condition.as_ref().map_or(true, |condition| {
            condition.evaluate(&ConditionContext::new(
                &self.state.path,
                &self.state.collected_tags,
            ))
        })
    }

    fn announce_start(&self) {
        info!(
            quiz_id = %self.graph.quiz_id(),
            session_id = %self.session_id,
            start_node = %self.state.current_node_id,
            "Quiz session started"
        );
        self.notifier.notify(SessionEvent::Start {
            quiz_id: self.graph.quiz_id().to_string(),
            session_id: self.session_id.clone(),
            at: Utc::now(),
        });
    }
}

impl fmt::Debug for TraversalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalEngine")
            .field("quiz_id", &self.graph.quiz_id())
            .field("session_id", &self.session_id)
            .field("status", &self.status)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn ensure_valid(graph: &QuizGraph) -> TraversalResult<()> {
    let report = graph.validate();
    if report.is_valid() {
        return Ok(());
    }
    warn!(
        quiz_id = %graph.quiz_id(),
        issues = report.issues().len(),
        report = %report,
        "Refusing to traverse invalid quiz"
    );
    Err(TraversalError::InvalidGraph(report))
}
