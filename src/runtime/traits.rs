//! Trait abstractions for runtime I/O
//!
//! These traits let the session manager run against mocks in tests.

use crate::db::{Database, DbError, SessionRecord};
use crate::interview::SessionState;
use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),
    /// Saved version differs from the one the caller loaded
    #[error("session {id} changed since version {expected}")]
    Conflict { id: String, expected: i64 },
    #[error("storage backend: {0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SessionNotFound(id) => StoreError::NotFound(id),
            DbError::VersionConflict { id, expected } => StoreError::Conflict { id, expected },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable storage for session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session and assign it an id
    async fn create(&self, state: &SessionState) -> Result<SessionRecord, StoreError>;

    /// Load a session, `None` if it does not exist
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Replace the state if the stored version still equals `expected_version`.
    /// Returns the new version.
    async fn save(
        &self,
        id: &str,
        state: &SessionState,
        expected_version: i64,
    ) -> Result<i64, StoreError>;

    /// Mark a session inactive
    async fn deactivate(&self, id: &str) -> Result<(), StoreError>;
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    #[allow(dead_code)] // API completeness
    fn model_id(&self) -> &str;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn create(&self, state: &SessionState) -> Result<SessionRecord, StoreError> {
        (**self).create(state).await
    }

    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        (**self).load(id).await
    }

    async fn save(
        &self,
        id: &str,
        state: &SessionState,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        (**self).save(id, state, expected_version).await
    }

    async fn deactivate(&self, id: &str) -> Result<(), StoreError> {
        (**self).deactivate(id).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `SessionStore`
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseStore {
    async fn create(&self, state: &SessionState) -> Result<SessionRecord, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        Ok(self.db.create_session(&id, state)?)
    }

    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self.db.get_session(id) {
            Ok(record) => Ok(Some(record)),
            Err(DbError::SessionNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(
        &self,
        id: &str,
        state: &SessionState,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        Ok(self.db.update_session_state(id, state, expected_version)?)
    }

    async fn deactivate(&self, id: &str) -> Result<(), StoreError> {
        Ok(self.db.deactivate_session(id)?)
    }
}

/// Adapter to use `ModelRegistry` as `LlmClient`
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        let model_id = registry.default_model_id().to_string();
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .default()
            .ok_or_else(|| LlmError::auth("LLM not configured"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
