//! Shapes requested from the model, with validation rules

use super::state::{Difficulty, Evaluation, FinalReport, ResumeSummary};
use crate::generator::Schema;
use serde::Deserialize;
use serde_json::{json, Value};

/// Upper bound of the 0–10 rubric
pub const MAX_SCORE: u8 = 10;
/// Upper bound of the overall report score
pub const MAX_OVERALL_SCORE: u8 = 100;

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn score(max: u8) -> Value {
    json!({ "type": "integer", "minimum": 0, "maximum": max })
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

/// Model proposal for a main question; id and counters are assigned locally
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    /// Falls back to the tier for the question number when absent
    #[serde(default)]
    pub topic: Option<String>,
    pub expected_points: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub time_limit_sec: Option<u32>,
}

impl Schema for QuestionDraft {
    const NAME: &'static str = "Question";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "The question exactly as it will be asked" },
                "topic": { "type": "string" },
                "expected_points": string_list(),
                "difficulty": { "type": "string", "enum": ["Easy", "Medium", "Hard"] },
                "time_limit_sec": { "type": "integer", "minimum": 15 }
            },
            "required": ["text", "expected_points"]
        })
    }

    fn validate(&self) -> Result<(), String> {
        require_text("text", &self.text)
    }
}

/// Model proposal for a follow-up probe
#[derive(Debug, Clone, Deserialize)]
pub struct FollowupDraft {
    pub text: String,
    #[serde(default)]
    pub expected_points: Vec<String>,
}

impl Schema for FollowupDraft {
    const NAME: &'static str = "FollowupQuestion";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "One short, pointed follow-up question" },
                "expected_points": string_list()
            },
            "required": ["text"]
        })
    }

    fn validate(&self) -> Result<(), String> {
        require_text("text", &self.text)
    }
}

impl Schema for ResumeSummary {
    const NAME: &'static str = "ResumeSummary";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "skills": string_list(),
                "projects": string_list(),
                "achievements": string_list(),
                "keywords": string_list(),
                "raw_text_snippet": { "type": "string" }
            },
            "required": ["skills", "projects", "achievements", "keywords"]
        })
    }
}

impl Schema for Evaluation {
    const NAME: &'static str = "Evaluation";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "correctness_score": score(MAX_SCORE),
                "depth_score": score(MAX_SCORE),
                "structure_score": score(MAX_SCORE),
                "communication_score": score(MAX_SCORE),
                "missing_points": string_list(),
                "feedback_text": { "type": "string" },
                "followup_needed": { "type": "boolean" },
                "followup_reason": { "type": "string" },
                "followup_question": { "type": "string" }
            },
            "required": [
                "correctness_score", "depth_score", "structure_score",
                "communication_score", "missing_points", "feedback_text", "followup_needed"
            ]
        })
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(bad) = self.scores().iter().find(|s| **s > MAX_SCORE) {
            return Err(format!("score {bad} is outside 0-{MAX_SCORE}"));
        }
        require_text("feedback_text", &self.feedback_text)
    }
}

impl Schema for FinalReport {
    const NAME: &'static str = "FinalReport";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "overall_score": score(MAX_OVERALL_SCORE),
                "category_scores": {
                    "type": "object",
                    "additionalProperties": score(MAX_SCORE)
                },
                "strengths": string_list(),
                "weaknesses": string_list(),
                "improvement_plan_7_days": string_list(),
                "improved_answers": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question_id": { "type": "string" },
                            "improved_answer": { "type": "string" }
                        },
                        "required": ["question_id", "improved_answer"]
                    }
                }
            },
            "required": [
                "overall_score", "category_scores", "strengths",
                "weaknesses", "improvement_plan_7_days"
            ]
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.overall_score > MAX_OVERALL_SCORE {
            return Err(format!(
                "overall_score {} is outside 0-{MAX_OVERALL_SCORE}",
                self.overall_score
            ));
        }
        if let Some((name, value)) = self
            .category_scores
            .iter()
            .find(|(_, value)| **value > MAX_SCORE)
        {
            return Err(format!("category {name} scored {value}, above {MAX_SCORE}"));
        }
        Ok(())
    }
}
