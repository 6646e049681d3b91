//! Session state types
//!
//! `SessionState` is the only record of an interview's progress. There is no
//! stored "current step": the router derives what to do next from these
//! fields alone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Configuration
// ============================================================================

/// Position the candidate is interviewing for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "SDE1")]
    Sde1,
    #[serde(rename = "Product Manager")]
    ProductManager,
    #[serde(rename = "Marketing Manager")]
    MarketingManager,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Sde1 => "SDE1",
            Role::ProductManager => "Product Manager",
            Role::MarketingManager => "Marketing Manager",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "SDE1" => Some(Role::Sde1),
            "Product Manager" => Some(Role::ProductManager),
            "Marketing Manager" => Some(Role::MarketingManager),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Interview difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable settings chosen when a session is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub role: Role,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub max_followups_per_question: u32,
}

// ============================================================================
// Transcript
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn interviewer(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Interviewer,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Candidate,
            text: text.into(),
        }
    }
}

// ============================================================================
// Questions
// ============================================================================

/// Discriminant for the two question variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Scheduled, counted question
    Main,
    /// Uncounted probe into the answer to `parent_id`
    Followup { parent_id: String, sequence: u32 },
}

/// A question put to the candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub topic: String,
    #[serde(default)]
    pub expected_points: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(default = "default_time_limit")]
    pub time_limit_sec: u32,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

fn default_time_limit() -> u32 {
    60
}

impl Question {
    pub fn is_followup(&self) -> bool {
        matches!(self.kind, QuestionKind::Followup { .. })
    }

    /// Id of the main question this one belongs to (itself when main)
    pub fn main_id(&self) -> &str {
        match &self.kind {
            QuestionKind::Main => &self.id,
            QuestionKind::Followup { parent_id, .. } => parent_id,
        }
    }
}

/// Id for the `n`th main question
pub fn main_question_id(n: u32) -> String {
    format!("q_{n}")
}

/// Id for the `sequence`th follow-up under `parent_id`
///
/// Always built from the main question's id so follow-up chains never nest.
pub fn followup_question_id(parent_id: &str, sequence: u32) -> String {
    format!("{parent_id}_f{sequence}")
}

// ============================================================================
// Answers and grading
// ============================================================================

/// A submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub text: String,
}

/// Grading of one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub question_id: String,
    pub correctness_score: u8,
    pub depth_score: u8,
    pub structure_score: u8,
    pub communication_score: u8,
    pub missing_points: Vec<String>,
    pub feedback_text: String,
    pub followup_needed: bool,
    #[serde(default)]
    pub followup_reason: Option<String>,
    #[serde(default)]
    pub followup_question: Option<String>,
}

impl Evaluation {
    pub fn scores(&self) -> [u8; 4] {
        [
            self.correctness_score,
            self.depth_score,
            self.structure_score,
            self.communication_score,
        ]
    }
}

/// Structured digest of the candidate's resume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSummary {
    pub skills: Vec<String>,
    pub projects: Vec<String>,
    pub achievements: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub raw_text_snippet: Option<String>,
}

/// A model answer for a question the candidate struggled with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovedAnswer {
    pub question_id: String,
    pub improved_answer: String,
}

/// Scored summary produced once the interview ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub overall_score: u8,
    pub category_scores: BTreeMap<String, u8>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvement_plan_7_days: Vec<String>,
    #[serde(default)]
    pub improved_answers: Vec<ImprovedAnswer>,
}

// ============================================================================
// Session State
// ============================================================================

/// Complete durable record of one interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub role: Role,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub max_followups_per_question: u32,

    /// Extracted resume text, input to summarization
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub resume_summary: Option<ResumeSummary>,

    /// Append-only conversational record
    #[serde(default)]
    pub transcript: Vec<Turn>,
    /// Most recently generated question; superseded, never cleared
    #[serde(default)]
    pub current_question: Option<Question>,

    #[serde(default)]
    pub asked_main_questions: u32,
    #[serde(default)]
    pub followup_count_for_current: u32,

    #[serde(default)]
    pub answer_history: Vec<Answer>,
    #[serde(default)]
    pub eval_history: Vec<Evaluation>,

    #[serde(default)]
    pub final_report: Option<FinalReport>,
    #[serde(default)]
    pub is_finished: bool,
}

impl SessionState {
    /// Fresh state for a new interview
    pub fn new(config: &SessionConfig, resume_text: impl Into<String>) -> Self {
        Self {
            role: config.role,
            difficulty: config.difficulty,
            total_questions: config.total_questions,
            max_followups_per_question: config.max_followups_per_question,
            resume_text: resume_text.into(),
            resume_summary: None,
            transcript: Vec::new(),
            current_question: None,
            asked_main_questions: 0,
            followup_count_for_current: 0,
            answer_history: Vec::new(),
            eval_history: Vec::new(),
            final_report: None,
            is_finished: false,
        }
    }

    /// An answer has been submitted but not graded yet
    pub fn has_ungraded_answer(&self) -> bool {
        self.answer_history.len() > self.eval_history.len()
    }

    pub fn latest_evaluation(&self) -> Option<&Evaluation> {
        self.eval_history.last()
    }

    pub fn latest_answer(&self) -> Option<&Answer> {
        self.answer_history.last()
    }

    /// `min(asked, total) / total`
    pub fn progress(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        let asked = self.asked_main_questions.min(self.total_questions);
        f64::from(asked) / f64::from(self.total_questions)
    }

    /// Check the invariants every handler must preserve
    pub fn check_invariants(&self) -> Result<(), String> {
        let answers = self.answer_history.len();
        let evals = self.eval_history.len();
        if evals > answers || answers > evals + 1 {
            return Err(format!(
                "answer/evaluation parity broken: {answers} answers, {evals} evaluations"
            ));
        }
        if self.followup_count_for_current > self.max_followups_per_question {
            return Err(format!(
                "follow-up count {} exceeds cap {}",
                self.followup_count_for_current, self.max_followups_per_question
            ));
        }
        if self.asked_main_questions > self.total_questions {
            return Err(format!(
                "asked {} main questions of {}",
                self.asked_main_questions, self.total_questions
            ));
        }
        if self.final_report.is_some() && !self.is_finished {
            return Err("report present on an unfinished session".to_string());
        }
        if let Some(question) = &self.current_question {
            if let QuestionKind::Followup {
                parent_id,
                sequence,
            } = &question.kind
            {
                if question.id != followup_question_id(parent_id, *sequence) {
                    return Err(format!(
                        "follow-up id {} does not derive from {parent_id}",
                        question.id
                    ));
                }
            }
        }
        Ok(())
    }
}
