//! Action handlers
//!
//! Each handler reads the current state, makes at most one generator call and
//! returns a new state. The state update half of every handler is a plain
//! function (`apply_*`) so it can be exercised without a model.

use super::action::Action;
use super::prompts;
use super::schema::{FollowupDraft, QuestionDraft};
use super::state::{
    followup_question_id, main_question_id, Evaluation, FinalReport, Question, QuestionKind,
    ResumeSummary, SessionState, Speaker, Turn,
};
use crate::generator::{ContentGenerator, GenerationError};
use crate::runtime::LlmClient;
use thiserror::Error;

const DEFAULT_TIME_LIMIT_SEC: u32 = 60;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The router sent us here but the state does not allow it
    #[error("{action} precondition failed: {reason}")]
    Precondition { action: Action, reason: String },
}

fn precondition(action: Action, reason: impl Into<String>) -> HandlerError {
    HandlerError::Precondition {
        action,
        reason: reason.into(),
    }
}

/// Run `action` against `state`
pub async fn run<L: LlmClient>(
    action: Action,
    state: &SessionState,
    generator: &ContentGenerator<L>,
) -> Result<SessionState, HandlerError> {
    match action {
        Action::Summarize => summarize(state, generator).await,
        Action::GenerateMainQuestion => generate_main_question(state, generator).await,
        Action::GenerateFollowup => generate_followup(state, generator).await,
        Action::EvaluateAnswer => evaluate_answer(state, generator).await,
        Action::GenerateReport => generate_report(state, generator).await,
    }
}

// ============================================================================
// Summarize
// ============================================================================

async fn summarize<L: LlmClient>(
    state: &SessionState,
    generator: &ContentGenerator<L>,
) -> Result<SessionState, HandlerError> {
    tracing::info!(action = %Action::Summarize, resume_chars = state.resume_text.len(), "Summarizing resume");
    let context = format!("RESUME TEXT:\n{}", state.resume_text);
    let summary: ResumeSummary = generator.generate(prompts::SUMMARIZE, &context).await?;
    Ok(apply_summary(state, summary))
}

pub fn apply_summary(state: &SessionState, summary: ResumeSummary) -> SessionState {
    let mut next = state.clone();
    next.resume_summary = Some(summary);
    next
}

// ============================================================================
// Main question
// ============================================================================

async fn generate_main_question<L: LlmClient>(
    state: &SessionState,
    generator: &ContentGenerator<L>,
) -> Result<SessionState, HandlerError> {
    let n = state.asked_main_questions + 1;
    if n > state.total_questions {
        return Err(precondition(
            Action::GenerateMainQuestion,
            format!("all {} main questions already asked", state.total_questions),
        ));
    }
    let topic = prompts::topic_for(n);
    tracing::info!(action = %Action::GenerateMainQuestion, question = n, topic, "Generating main question");

    let draft: QuestionDraft = generator
        .generate(
            &prompts::main_question(state.role, state.difficulty, topic),
            &prompts::main_question_context(state, n),
        )
        .await?;
    Ok(apply_main_question(state, draft))
}

/// Install the next main question and reset the follow-up counter
pub fn apply_main_question(state: &SessionState, draft: QuestionDraft) -> SessionState {
    let n = state.asked_main_questions + 1;
    let topic = draft
        .topic
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| prompts::topic_for(n).to_string());
    let question = Question {
        id: main_question_id(n),
        text: draft.text.trim().to_string(),
        topic,
        expected_points: draft.expected_points,
        difficulty: draft.difficulty.unwrap_or(state.difficulty),
        time_limit_sec: draft.time_limit_sec.unwrap_or(DEFAULT_TIME_LIMIT_SEC),
        kind: QuestionKind::Main,
    };

    let mut next = state.clone();
    next.asked_main_questions = n;
    next.followup_count_for_current = 0;
    next.transcript.push(Turn::interviewer(question.text.clone()));
    next.current_question = Some(question);
    next
}

// ============================================================================
// Follow-up
// ============================================================================

async fn generate_followup<L: LlmClient>(
    state: &SessionState,
    generator: &ContentGenerator<L>,
) -> Result<SessionState, HandlerError> {
    let action = Action::GenerateFollowup;
    let question = state
        .current_question
        .as_ref()
        .ok_or_else(|| precondition(action, "no question to follow up on"))?;
    let evaluation = state
        .latest_evaluation()
        .filter(|eval| eval.followup_needed)
        .ok_or_else(|| precondition(action, "latest evaluation did not ask for a follow-up"))?;
    let answer = state
        .latest_answer()
        .ok_or_else(|| precondition(action, "no answer to follow up on"))?;
    if state.followup_count_for_current >= state.max_followups_per_question {
        return Err(precondition(action, "follow-up cap reached"));
    }

    tracing::info!(
        action = %action,
        parent = question.main_id(),
        sequence = state.followup_count_for_current + 1,
        "Generating follow-up"
    );
    let draft: FollowupDraft = generator
        .generate(
            prompts::FOLLOWUP,
            &prompts::followup_context(question, answer, evaluation),
        )
        .await?;
    apply_followup(state, draft).ok_or_else(|| precondition(action, "no question to follow up on"))
}

/// Install a follow-up under the current question's main question
///
/// Returns `None` when there is no current question.
pub fn apply_followup(state: &SessionState, draft: FollowupDraft) -> Option<SessionState> {
    let current = state.current_question.as_ref()?;
    let parent_id = current.main_id().to_string();
    let sequence = state.followup_count_for_current + 1;

    let expected_points = if draft.expected_points.is_empty() {
        state
            .latest_evaluation()
            .map(|eval| eval.missing_points.clone())
            .unwrap_or_default()
    } else {
        draft.expected_points
    };

    let question = Question {
        id: followup_question_id(&parent_id, sequence),
        text: draft.text.trim().to_string(),
        topic: current.topic.clone(),
        expected_points,
        difficulty: current.difficulty,
        time_limit_sec: current.time_limit_sec,
        kind: QuestionKind::Followup {
            parent_id,
            sequence,
        },
    };

    let mut next = state.clone();
    next.followup_count_for_current = sequence;
    next.transcript.push(Turn::interviewer(question.text.clone()));
    next.current_question = Some(question);
    Some(next)
}

// ============================================================================
// Evaluation
// ============================================================================

async fn evaluate_answer<L: LlmClient>(
    state: &SessionState,
    generator: &ContentGenerator<L>,
) -> Result<SessionState, HandlerError> {
    let action = Action::EvaluateAnswer;
    if !state.has_ungraded_answer() {
        return Err(precondition(action, "no ungraded answer"));
    }
    let question = state
        .current_question
        .as_ref()
        .ok_or_else(|| precondition(action, "no current question"))?;
    let answer = state
        .latest_answer()
        .ok_or_else(|| precondition(action, "no answer"))?;

    let recorded = record_candidate_turn(state);
    tracing::info!(action = %action, question = %question.id, "Grading answer");

    let evaluation: Evaluation = generator
        .generate(prompts::EVALUATE, &prompts::evaluate_context(question, answer))
        .await?;
    Ok(apply_evaluation(&recorded, evaluation))
}

/// Append the latest answer to the transcript unless it is already there
pub fn record_candidate_turn(state: &SessionState) -> SessionState {
    let mut next = state.clone();
    let already_recorded = next
        .transcript
        .last()
        .is_some_and(|turn| turn.speaker == Speaker::Candidate);
    if let (false, Some(answer)) = (already_recorded, state.latest_answer()) {
        next.transcript.push(Turn::candidate(answer.text.clone()));
    }
    next
}

/// Link the evaluation to the current question and record it
///
/// A no-op when every answer is already graded.
pub fn apply_evaluation(state: &SessionState, mut evaluation: Evaluation) -> SessionState {
    let mut next = state.clone();
    if !next.has_ungraded_answer() {
        return next;
    }
    if let Some(question) = &next.current_question {
        evaluation.question_id.clone_from(&question.id);
    }
    next.eval_history.push(evaluation);
    next
}

// ============================================================================
// Report
// ============================================================================

async fn generate_report<L: LlmClient>(
    state: &SessionState,
    generator: &ContentGenerator<L>,
) -> Result<SessionState, HandlerError> {
    tracing::info!(
        action = %Action::GenerateReport,
        answered = state.eval_history.len(),
        "Generating final report"
    );
    let report: FinalReport = generator
        .generate(prompts::REPORT, &prompts::report_context(state))
        .await?;
    Ok(apply_report(state, report))
}

pub fn apply_report(state: &SessionState, report: FinalReport) -> SessionState {
    let mut next = state.clone();
    next.final_report = Some(report);
    next.is_finished = true;
    next
}
