//! Session runtime
//!
//! Owns the load, run, save cycle for every inbound operation. Each turn
//! for a session runs under that session's lock, and saves are checked
//! against the version that was loaded.

mod engine;
mod locks;
pub mod traits;
mod view;

#[cfg(test)]
pub mod testing;

pub use engine::{EngineError, TurnEngine, TurnOutcome, MAX_ACTIONS_PER_TURN};
pub use traits::*;
pub use view::SessionView;

use crate::db::SessionRecord;
use crate::generator::{ContentGenerator, GenerationError};
use crate::interview::{
    Answer, Difficulty, FinalReport, Phase, Role, SessionConfig, SessionState,
};
use locks::SessionLocks;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Type alias for the production manager with concrete implementations
pub type ProductionManager = SessionManager<DatabaseStore, RegistryLlmClient>;

pub const MAX_TOTAL_QUESTIONS: u32 = 20;
pub const MAX_FOLLOWUPS_PER_QUESTION: u32 = 3;
pub const DEFAULT_MAX_FOLLOWUPS: u32 = 1;

// ============================================================================
// Errors
// ============================================================================

/// What a client should do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    TryAgain,
    InvalidRequest,
    InternalDefect,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::TryAgain => "try_again",
            ErrorClass::InvalidRequest => "invalid_request",
            ErrorClass::InternalDefect => "internal_defect",
        })
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session {0} was modified concurrently, retry")]
    Conflict(String),
    #[error("content generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("internal error: {0}")]
    Defect(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::InvalidRequest(_) | SessionError::NotFound(_) => {
                ErrorClass::InvalidRequest
            }
            SessionError::Conflict(_) => ErrorClass::TryAgain,
            SessionError::Generation(e) if e.is_transient() => ErrorClass::TryAgain,
            SessionError::Generation(_) | SessionError::Defect(_) | SessionError::Storage(_) => {
                ErrorClass::InternalDefect
            }
        }
    }
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Generation(e) => SessionError::Generation(e),
            defect @ (EngineError::LoopBoundExceeded { .. } | EngineError::Inconsistent { .. }) => {
                SessionError::Defect(defect.to_string())
            }
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SessionError::NotFound(id),
            StoreError::Conflict { id, .. } => SessionError::Conflict(id),
            StoreError::Backend(msg) => SessionError::Storage(msg),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Parameters for a new interview
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub role: Role,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    /// Falls back to the manager's default
    pub max_followups: Option<u32>,
    pub resume_text: String,
}

// ============================================================================
// Session Manager
// ============================================================================

pub struct SessionManager<S, L> {
    store: S,
    engine: TurnEngine<L>,
    locks: SessionLocks,
    default_max_followups: u32,
}

impl<S: SessionStore, L: LlmClient> SessionManager<S, L> {
    pub fn new(store: S, generator: ContentGenerator<L>) -> Self {
        Self::with_engine(store, TurnEngine::new(generator))
    }

    pub fn with_engine(store: S, engine: TurnEngine<L>) -> Self {
        Self {
            store,
            engine,
            locks: SessionLocks::new(),
            default_max_followups: DEFAULT_MAX_FOLLOWUPS,
        }
    }

    #[must_use]
    pub fn with_default_max_followups(mut self, max_followups: u32) -> Self {
        self.default_max_followups = max_followups.min(MAX_FOLLOWUPS_PER_QUESTION);
        self
    }

    /// Validate, run the first turn, then persist
    ///
    /// Nothing is stored if the first turn fails.
    pub async fn start_session(&self, request: StartRequest) -> Result<SessionView, SessionError> {
        let config = self.validate_start(&request)?;
        let state = SessionState::new(&config, request.resume_text);

        let outcome = self.engine.run("new", state).await?;
        let record = self.store.create(&outcome.state).await?;

        tracing::info!(
            session_id = %record.id,
            role = %config.role,
            difficulty = %config.difficulty,
            total_questions = config.total_questions,
            actions = ?outcome.actions,
            "Session started"
        );
        Ok(SessionView::project(&record.id, &record.state))
    }

    fn validate_start(&self, request: &StartRequest) -> Result<SessionConfig, SessionError> {
        if !(1..=MAX_TOTAL_QUESTIONS).contains(&request.total_questions) {
            return Err(SessionError::InvalidRequest(format!(
                "num_questions must be between 1 and {MAX_TOTAL_QUESTIONS}"
            )));
        }
        let max_followups = request.max_followups.unwrap_or(self.default_max_followups);
        if max_followups > MAX_FOLLOWUPS_PER_QUESTION {
            return Err(SessionError::InvalidRequest(format!(
                "max_followups must be at most {MAX_FOLLOWUPS_PER_QUESTION}"
            )));
        }
        if request.resume_text.trim().is_empty() {
            return Err(SessionError::InvalidRequest(
                "resume text is empty".to_string(),
            ));
        }
        Ok(SessionConfig {
            role: request.role,
            difficulty: request.difficulty,
            total_questions: request.total_questions,
            max_followups_per_question: max_followups,
        })
    }

    /// Record an answer to the pending question and run the turn it triggers
    pub async fn submit_answer(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SessionView, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::InvalidRequest(
                "answer text is empty".to_string(),
            ));
        }

        let _guard = self.locks.acquire(session_id).await;
        let record = self.load(session_id).await?;
        if !record.is_active || record.state.is_finished {
            return Err(SessionError::InvalidRequest(
                "interview has already ended".to_string(),
            ));
        }

        let mut state = record.state;
        let question_id = match (&state.current_question, Phase::of(&state)) {
            (Some(question), Phase::AwaitingAnswer) => question.id.clone(),
            _ => {
                return Err(SessionError::InvalidRequest(
                    "no question is waiting for an answer".to_string(),
                ))
            }
        };
        state.answer_history.push(Answer {
            question_id: question_id.clone(),
            text: text.to_string(),
        });

        let outcome = self.engine.run(session_id, state).await?;
        self.store
            .save(session_id, &outcome.state, record.version)
            .await?;

        tracing::info!(
            session_id,
            question = %question_id,
            actions = ?outcome.actions,
            "Answer processed"
        );
        Ok(SessionView::project(session_id, &outcome.state))
    }

    /// Finish the interview early (or confirm it finished) and deactivate it
    pub async fn end_session(&self, session_id: &str) -> Result<SessionView, SessionError> {
        let _guard = self.locks.acquire(session_id).await;
        let record = self.load(session_id).await?;

        let mut state = record.state.clone();
        state.is_finished = true;
        let outcome = self.engine.run(session_id, state).await?;

        if outcome.state != record.state {
            self.store
                .save(session_id, &outcome.state, record.version)
                .await?;
        }
        self.store.deactivate(session_id).await?;

        tracing::info!(session_id, actions = ?outcome.actions, "Session ended");
        Ok(SessionView::project(session_id, &outcome.state))
    }

    pub async fn get_state(&self, session_id: &str) -> Result<SessionView, SessionError> {
        let record = self.load(session_id).await?;
        Ok(SessionView::project(session_id, &record.state))
    }

    pub async fn get_report(&self, session_id: &str) -> Result<FinalReport, SessionError> {
        let record = self.load(session_id).await?;
        record
            .state
            .final_report
            .ok_or_else(|| SessionError::InvalidRequest("report is not ready yet".to_string()))
    }

    async fn load(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        self.store
            .load(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}
