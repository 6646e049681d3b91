//! Property-based tests for routing and state updates
//!
//! Turns are simulated with the pure `apply_*` functions and canned model
//! output, so whole interviews can be explored without an LLM.

use super::action::{Action, Decision};
use super::handlers::{
    apply_evaluation, apply_followup, apply_main_question, apply_report, apply_summary,
    record_candidate_turn,
};
use super::router::next_action;
use super::schema::{FollowupDraft, QuestionDraft};
use super::state::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Canned model output
// ============================================================================

fn question_draft(n: usize) -> QuestionDraft {
    QuestionDraft {
        text: format!("Main question {n}"),
        topic: None,
        expected_points: vec!["a".to_string(), "b".to_string()],
        difficulty: None,
        time_limit_sec: None,
    }
}

fn followup_draft() -> FollowupDraft {
    FollowupDraft {
        text: "Can you go deeper?".to_string(),
        expected_points: vec![],
    }
}

fn evaluation(followup_needed: bool) -> Evaluation {
    let score = if followup_needed { 3 } else { 9 };
    Evaluation {
        question_id: String::new(),
        correctness_score: score,
        depth_score: score,
        structure_score: score,
        communication_score: score,
        missing_points: if followup_needed {
            vec!["b".to_string()]
        } else {
            vec![]
        },
        feedback_text: "feedback".to_string(),
        followup_needed,
        followup_reason: None,
        followup_question: None,
    }
}

fn report() -> FinalReport {
    FinalReport {
        overall_score: 50,
        category_scores: BTreeMap::new(),
        strengths: vec![],
        weaknesses: vec![],
        improvement_plan_7_days: vec![],
        improved_answers: vec![],
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Input {
    Answer { weak: bool },
    End,
}

fn arb_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        4 => any::<bool>().prop_map(|weak| Input::Answer { weak }),
        1 => Just(Input::End),
    ]
}

fn fresh(total_questions: u32, max_followups: u32) -> SessionState {
    SessionState::new(
        &SessionConfig {
            role: Role::Sde1,
            difficulty: Difficulty::Medium,
            total_questions,
            max_followups_per_question: max_followups,
        },
        "resume text",
    )
}

/// Apply one routed action with canned output; `weak` decides the grade
fn step(state: &SessionState, action: Action, weak: bool) -> SessionState {
    match action {
        Action::Summarize => apply_summary(state, ResumeSummary::default()),
        Action::GenerateMainQuestion => {
            apply_main_question(state, question_draft(state.transcript.len()))
        }
        Action::GenerateFollowup => {
            apply_followup(state, followup_draft()).unwrap_or_else(|| state.clone())
        }
        Action::EvaluateAnswer => {
            apply_evaluation(&record_candidate_turn(state), evaluation(weak))
        }
        Action::GenerateReport => apply_report(state, report()),
    }
}

/// Engine loop over pure steps, returning the actions taken
fn run_turn(state: &mut SessionState, weak: bool) -> Result<Vec<Action>, TestCaseError> {
    let mut trail = Vec::new();
    while let Decision::Run(action) = next_action(state) {
        prop_assert!(
            trail.len() < Action::ALL.len(),
            "turn did not halt: {:?}",
            trail
        );
        let before = state.clone();
        let after = step(state, action, weak);

        prop_assert!(after.check_invariants().is_ok(), "{:?}", after.check_invariants());
        prop_assert!(after.asked_main_questions >= before.asked_main_questions);
        if action != Action::GenerateMainQuestion {
            prop_assert!(after.followup_count_for_current >= before.followup_count_for_current);
        }
        prop_assert!(after.transcript.starts_with(&before.transcript));

        trail.push(action);
        *state = after;
    }
    let gap = state.answer_history.len() - state.eval_history.len();
    prop_assert!(gap <= 1);
    Ok(trail)
}

fn submit(state: &mut SessionState, text: &str) -> bool {
    if state.is_finished || state.has_ungraded_answer() {
        return false;
    }
    let Some(question) = &state.current_question else {
        return false;
    };
    state.answer_history.push(Answer {
        question_id: question.id.clone(),
        text: text.to_string(),
    });
    true
}

// ============================================================================
// Arbitrary states for direct router checks
// ============================================================================

fn arb_state() -> impl Strategy<Value = SessionState> {
    (
        1u32..8,
        0u32..4,
        0u32..8,
        0u32..4,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        0usize..3,
        prop_oneof![Just(None), Just(Some(false)), Just(Some(true))],
    )
        .prop_map(
            |(total, cap, asked, used, summarized, finished, reported, pending, last_eval)| {
                let mut state = fresh(total, cap);
                state.asked_main_questions = asked.min(total);
                state.followup_count_for_current = used.min(cap);
                if summarized {
                    state.resume_summary = Some(ResumeSummary::default());
                }
                state.is_finished = finished;
                if finished && reported {
                    state.final_report = Some(report());
                }
                if let Some(weak) = last_eval {
                    state.answer_history.push(Answer {
                        question_id: "q_1".to_string(),
                        text: "a".to_string(),
                    });
                    state.eval_history.push(evaluation(weak));
                }
                if pending > 0 {
                    state.answer_history.push(Answer {
                        question_id: "q_1".to_string(),
                        text: "b".to_string(),
                    });
                }
                // Unanswered question on the table
                if pending == 2 {
                    state.transcript.push(Turn::interviewer("Q"));
                }
                state
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_router_is_deterministic(state in arb_state()) {
        let snapshot = state.clone();
        prop_assert_eq!(next_action(&state), next_action(&state));
        prop_assert_eq!(state, snapshot);
    }

    #[test]
    fn prop_router_respects_followup_cap(state in arb_state()) {
        if state.followup_count_for_current >= state.max_followups_per_question {
            prop_assert_ne!(next_action(&state), Decision::Run(Action::GenerateFollowup));
        }
    }

    #[test]
    fn prop_interviews_keep_invariants(
        total in 1u32..6,
        cap in 0u32..4,
        inputs in proptest::collection::vec(arb_input(), 0..30),
    ) {
        let mut state = fresh(total, cap);
        run_turn(&mut state, false)?;
        prop_assert!(state.current_question.is_some());

        for input in inputs {
            if state.final_report.is_some() {
                prop_assert_eq!(next_action(&state), Decision::Halt);
                break;
            }
            match input {
                Input::Answer { weak } => {
                    if submit(&mut state, "answer") {
                        run_turn(&mut state, weak)?;
                    }
                }
                Input::End => {
                    state.is_finished = true;
                    let trail = run_turn(&mut state, false)?;
                    prop_assert_eq!(trail.last(), Some(&Action::GenerateReport));
                    prop_assert!(state.final_report.is_some());
                    prop_assert_eq!(next_action(&state), Decision::Halt);
                }
            }
        }
    }

    #[test]
    fn prop_strong_answers_reach_report_after_total(total in 1u32..8, cap in 0u32..4) {
        let mut state = fresh(total, cap);
        run_turn(&mut state, false)?;

        let mut answered = 0;
        while state.final_report.is_none() {
            prop_assert!(submit(&mut state, "a thorough answer"));
            answered += 1;
            run_turn(&mut state, false)?;
            prop_assert!(answered <= total);
        }

        prop_assert_eq!(answered, total);
        prop_assert_eq!(state.asked_main_questions, total);
        prop_assert!(state.answer_history.iter().all(|a| !a.question_id.contains("_f")));
    }

    #[test]
    fn prop_followups_stop_at_cap(total in 1u32..4, cap in 0u32..4) {
        let mut state = fresh(total, cap);
        run_turn(&mut state, false)?;

        // Every answer is weak, so each main question collects exactly `cap` follow-ups
        while state.final_report.is_none() {
            prop_assert!(submit(&mut state, "um"));
            run_turn(&mut state, true)?;
        }
        let expected = usize::try_from(total * (cap + 1)).unwrap_or(usize::MAX);
        prop_assert_eq!(state.answer_history.len(), expected);
    }
}
