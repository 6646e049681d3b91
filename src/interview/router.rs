//! Pure routing function
//!
//! The session's phase is projected from persisted fields, then mapped to
//! the single action that must run next. Both steps are pure: the same
//! state always yields the same decision.

use super::action::{Action, Decision};
use super::state::{SessionState, Speaker};

/// Where the session stands, derived only from stored data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No resume summary yet
    Unsummarized,
    /// Ended but the report has not been produced
    Ending,
    /// Report produced; nothing left to do
    Closed,
    /// An answer is waiting to be graded
    Grading,
    /// A question is out and no answer has arrived
    AwaitingAnswer,
    /// Last answer graded; choose what to ask next
    BetweenQuestions(Progress),
}

/// Counters the between-questions rules look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// The latest evaluation asked for a follow-up
    pub followup_requested: bool,
    pub followups_used: u32,
    pub followup_cap: u32,
    pub main_asked: u32,
    pub main_total: u32,
}

impl Progress {
    fn followup_allowed(&self) -> bool {
        self.followup_requested && self.followups_used < self.followup_cap
    }

    fn questions_exhausted(&self) -> bool {
        self.main_asked >= self.main_total
    }
}

impl Phase {
    /// Project the state. Rule order is significant: first match wins.
    pub fn of(state: &SessionState) -> Self {
        if state.resume_summary.is_none() {
            return Phase::Unsummarized;
        }
        if state.is_finished {
            return if state.final_report.is_none() {
                Phase::Ending
            } else {
                Phase::Closed
            };
        }
        if state.has_ungraded_answer() {
            return Phase::Grading;
        }
        if state
            .transcript
            .last()
            .is_some_and(|turn| turn.speaker == Speaker::Interviewer)
        {
            return Phase::AwaitingAnswer;
        }
        Phase::BetweenQuestions(Progress {
            followup_requested: state
                .latest_evaluation()
                .is_some_and(|eval| eval.followup_needed),
            followups_used: state.followup_count_for_current,
            followup_cap: state.max_followups_per_question,
            main_asked: state.asked_main_questions,
            main_total: state.total_questions,
        })
    }
}

/// Next action for `state`, or `Halt`
pub fn next_action(state: &SessionState) -> Decision {
    route(&Phase::of(state))
}

/// Map a phase to its decision
pub fn route(phase: &Phase) -> Decision {
    match phase {
        Phase::Unsummarized => Decision::Run(Action::Summarize),
        Phase::Ending => Decision::Run(Action::GenerateReport),
        Phase::Closed | Phase::AwaitingAnswer => Decision::Halt,
        Phase::Grading => Decision::Run(Action::EvaluateAnswer),
        Phase::BetweenQuestions(progress) if progress.followup_allowed() => {
            Decision::Run(Action::GenerateFollowup)
        }
        Phase::BetweenQuestions(progress) if progress.questions_exhausted() => {
            Decision::Run(Action::GenerateReport)
        }
        Phase::BetweenQuestions(_) => Decision::Run(Action::GenerateMainQuestion),
    }
}
