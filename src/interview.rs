//! Interview core
//!
//! Session state, the router that decides what happens next, and the
//! handlers that carry each action out.

pub mod action;
pub mod handlers;
pub mod prompts;
pub mod router;
pub mod schema;
pub mod state;

#[cfg(test)]
mod proptests;

pub use action::{Action, Decision};
pub use handlers::HandlerError;
pub use router::{next_action, Phase};
pub use state::{
    Answer, Difficulty, Evaluation, FinalReport, Question, Role, SessionConfig, SessionState,
    Turn,
};
