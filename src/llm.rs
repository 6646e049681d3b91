//! LLM provider abstraction
//!
//! One configured backend (Gemini or a local Ollama model) answers
//! single-turn prompts. Everything above this module sees only
//! `LlmService`.

mod error;
mod gemini;
mod ollama;
mod registry;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiService;
pub use ollama::OllamaService;
pub use registry::{LlmConfig, ModelRegistry, Provider};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// A text completion backend
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn model_id(&self) -> &str;
}

/// Records latency, token usage and failures of every completion
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let started = Instant::now();
        let result = self.inner.complete(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let model = self.inner.model_id();

        match &result {
            Ok(response) => tracing::info!(
                model,
                elapsed_ms,
                json_output = request.json_output,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM completion"
            ),
            Err(e) => tracing::warn!(
                model,
                elapsed_ms,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                error = %e.message,
                "LLM completion failed"
            ),
        }
        result
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
