//! Turn engine
//!
//! Runs routed actions back to back until the router halts. The engine holds
//! no session state of its own; it takes a state and returns the successor.

use super::traits::LlmClient;
use crate::generator::{ContentGenerator, GenerationError};
use crate::interview::handlers::{self, HandlerError};
use crate::interview::{next_action, Action, Decision, SessionState};
use thiserror::Error;

/// A turn runs each action at most once
pub const MAX_ACTIONS_PER_TURN: usize = Action::ALL.len();

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The router kept routing; a router/handler contract is broken
    #[error("turn exceeded {limit} actions: {trail:?}")]
    LoopBoundExceeded { limit: usize, trail: Vec<Action> },
    /// A handler was routed to but its precondition did not hold
    #[error("{action} in inconsistent state: {reason}")]
    Inconsistent { action: Action, reason: String },
}

impl From<HandlerError> for EngineError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Generation(e) => EngineError::Generation(e),
            HandlerError::Precondition { action, reason } => {
                EngineError::Inconsistent { action, reason }
            }
        }
    }
}

/// Result of one turn
#[derive(Debug)]
pub struct TurnOutcome {
    pub state: SessionState,
    pub actions: Vec<Action>,
}

pub struct TurnEngine<L> {
    generator: ContentGenerator<L>,
    max_actions: usize,
}

impl<L: LlmClient> TurnEngine<L> {
    pub fn new(generator: ContentGenerator<L>) -> Self {
        Self {
            generator,
            max_actions: MAX_ACTIONS_PER_TURN,
        }
    }

    #[allow(dead_code)] // Used in tests
    #[must_use]
    pub fn with_max_actions(mut self, max_actions: usize) -> Self {
        self.max_actions = max_actions;
        self
    }

    /// Drive `state` until the router halts
    pub async fn run(
        &self,
        session_id: &str,
        state: SessionState,
    ) -> Result<TurnOutcome, EngineError> {
        let mut state = state;
        let mut actions = Vec::new();

        while let Decision::Run(action) = next_action(&state) {
            if actions.len() >= self.max_actions {
                actions.push(action);
                tracing::error!(
                    session_id,
                    limit = self.max_actions,
                    trail = ?actions,
                    "Turn did not halt"
                );
                return Err(EngineError::LoopBoundExceeded {
                    limit: self.max_actions,
                    trail: actions,
                });
            }

            tracing::debug!(session_id, action = %action, step = actions.len() + 1, "Running action");
            let next = handlers::run(action, &state, &self.generator).await?;
            if let Err(reason) = next.check_invariants() {
                tracing::error!(session_id, action = %action, %reason, "Handler broke an invariant");
                return Err(EngineError::Inconsistent { action, reason });
            }
            actions.push(action);
            state = next;
        }

        tracing::info!(
            session_id,
            steps = actions.len(),
            finished = state.is_finished,
            "Turn halted"
        );
        Ok(TurnOutcome { state, actions })
    }
}
