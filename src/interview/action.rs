//! Actions the router can ask the engine to run

use std::fmt;

/// One state transformation, run by exactly one handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Summarize,
    GenerateMainQuestion,
    GenerateFollowup,
    EvaluateAnswer,
    GenerateReport,
}

impl Action {
    /// Every action, in no particular order
    pub const ALL: [Action; 5] = [
        Action::Summarize,
        Action::GenerateMainQuestion,
        Action::GenerateFollowup,
        Action::EvaluateAnswer,
        Action::GenerateReport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Summarize => "summarize",
            Action::GenerateMainQuestion => "generate_main_question",
            Action::GenerateFollowup => "generate_followup",
            Action::EvaluateAnswer => "evaluate_answer",
            Action::GenerateReport => "generate_report",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Router output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run(Action),
    /// Wait for external input, or the session is over
    Halt,
}
