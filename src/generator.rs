//! Structured content generation
//!
//! Wraps an LLM client so callers get back a typed, validated value or a
//! classified failure. Invalid output and transient provider errors are
//! retried a bounded number of times; the last failure is surfaced.

use crate::llm::{LlmErrorKind, LlmRequest};
use crate::runtime::LlmClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One try plus two retries
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// A value the model can be asked to produce
pub trait Schema: DeserializeOwned {
    /// Name used in prompts and errors
    const NAME: &'static str;

    /// JSON Schema describing the expected object
    fn json_schema() -> Value;

    /// Semantic checks beyond the shape (ranges, non-empty text)
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Why generation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The provider call itself failed
    Llm(LlmErrorKind),
    /// The reply could not be parsed or failed validation
    InvalidOutput,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationErrorKind::Llm(kind) => write!(f, "llm {kind:?}"),
            GenerationErrorKind::InvalidOutput => f.write_str("invalid output"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{schema} generation failed after {attempts} attempt(s) ({kind}): {message}")]
pub struct GenerationError {
    pub schema: &'static str,
    pub kind: GenerationErrorKind,
    pub attempts: u32,
    pub message: String,
}

impl GenerationError {
    /// Whether retrying the whole request later can succeed
    ///
    /// Bad output and retryable provider errors are hiccups; a rejected key
    /// or a malformed request will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            GenerationErrorKind::InvalidOutput => true,
            GenerationErrorKind::Llm(kind) => kind.is_retryable(),
        }
    }
}

/// Produces schema-validated values from an LLM
pub struct ContentGenerator<L> {
    llm: Arc<L>,
    max_attempts: u32,
    backoff: Duration,
}

impl<L: LlmClient> ContentGenerator<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self {
            llm,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Base delay before retrying a transient provider error
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[allow(dead_code)] // Used in tests
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Ask for a `T` given an instruction (system role) and context (user role)
    pub async fn generate<T: Schema>(
        &self,
        instruction: &str,
        context: &str,
    ) -> Result<T, GenerationError> {
        let request = build_request::<T>(instruction, context);
        let mut last_failure = (GenerationErrorKind::InvalidOutput, String::new());

        for attempt in 1..=self.max_attempts {
            match self.llm.complete(&request).await {
                Ok(response) => match parse_structured::<T>(&response.text) {
                    Ok(value) => return Ok(value),
                    Err(message) => {
                        tracing::warn!(
                            schema = T::NAME,
                            attempt,
                            error = %message,
                            "Model output rejected"
                        );
                        last_failure = (GenerationErrorKind::InvalidOutput, message);
                    }
                },
                Err(e) if e.kind.is_retryable() => {
                    tracing::warn!(
                        schema = T::NAME,
                        attempt,
                        error = %e.message,
                        "Transient LLM failure"
                    );
                    if attempt < self.max_attempts {
                        let delay = e.retry_after.unwrap_or(self.backoff * attempt);
                        tokio::time::sleep(delay).await;
                    }
                    last_failure = (GenerationErrorKind::Llm(e.kind), e.message);
                }
                Err(e) => {
                    return Err(GenerationError {
                        schema: T::NAME,
                        kind: GenerationErrorKind::Llm(e.kind),
                        attempts: attempt,
                        message: e.message,
                    });
                }
            }
        }

        let (kind, message) = last_failure;
        Err(GenerationError {
            schema: T::NAME,
            kind,
            attempts: self.max_attempts,
            message,
        })
    }
}

fn build_request<T: Schema>(instruction: &str, context: &str) -> LlmRequest {
    let schema = serde_json::to_string_pretty(&T::json_schema()).unwrap_or_default();
    let system = format!(
        "{instruction}\n\nIMPORTANT: Reply with exactly one JSON object ({name}) that \
         conforms to this JSON Schema. No prose before or after it.\n{schema}",
        name = T::NAME,
    );
    LlmRequest::single_turn(system, context)
        .json()
        .with_temperature(DEFAULT_TEMPERATURE)
        .with_max_tokens(MAX_OUTPUT_TOKENS)
}

/// Parse and validate a model reply
pub fn parse_structured<T: Schema>(raw: &str) -> Result<T, String> {
    let json = extract_json_object(raw).ok_or_else(|| "no JSON object in reply".to_string())?;
    let value: T = serde_json::from_str(json)
        .map_err(|e| format!("reply does not match {}: {e}", T::NAME))?;
    value.validate()?;
    Ok(value)
}

/// Outermost `{...}` of a reply, ignoring Markdown fences or chatter
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}
