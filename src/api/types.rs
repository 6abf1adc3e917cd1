//! Shared state for the API handlers.

use std::sync::Arc;

use crate::store::QueueRepository;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub queue: Arc<dyn QueueRepository>,
}

impl ApiContext {
    pub fn new(queue: Arc<dyn QueueRepository>) -> Self {
        Self { queue }
    }
}
