//! HTTP API for the interview service

mod handlers;
mod types;

pub use handlers::create_router;

use crate::llm::ModelRegistry;
use crate::runtime::ProductionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ProductionManager>,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(sessions: ProductionManager, llm_registry: Arc<ModelRegistry>) -> Self {
        Self {
            sessions: Arc::new(sessions),
            llm_registry,
        }
    }
}
