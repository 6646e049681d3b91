//! Read-only projection of a session for clients

use crate::interview::{Evaluation, Phase, Question, SessionState, Turn};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: String,
    /// The question waiting for an answer, if any
    pub current_question: Option<Question>,
    /// `min(asked, total) / total`
    pub progress: f64,
    pub questions_asked: u32,
    pub total_questions: u32,
    pub transcript: Vec<Turn>,
    pub latest_evaluation: Option<Evaluation>,
    pub is_finished: bool,
    pub report_available: bool,
}

impl SessionView {
    pub fn project(session_id: &str, state: &SessionState) -> Self {
        let pending = Phase::of(state) == Phase::AwaitingAnswer;
        Self {
            session_id: session_id.to_string(),
            current_question: state.current_question.clone().filter(|_| pending),
            progress: state.progress(),
            questions_asked: state.asked_main_questions.min(state.total_questions),
            total_questions: state.total_questions,
            transcript: state.transcript.clone(),
            latest_evaluation: state.latest_evaluation().cloned(),
            is_finished: state.is_finished,
            report_available: state.final_report.is_some(),
        }
    }
}
