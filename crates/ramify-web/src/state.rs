//! Application state for the web server.

use ramify_runtime::SessionService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService>,
}

impl AppState {
    pub fn new(service: SessionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
