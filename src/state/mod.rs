use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::CoreState;
use crate::core::registry::CallRegistry;

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state: the call registry and per-call collaborators
    pub core_state: Arc<CoreState>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let core_state = CoreState::new(&config);
        Arc::new(Self { config, core_state })
    }

    /// Build state around an existing core, used by tests to inject fakes.
    pub fn with_core(config: ServerConfig, core_state: Arc<CoreState>) -> Arc<Self> {
        Arc::new(Self { config, core_state })
    }

    pub fn registry(&self) -> &Arc<CallRegistry> {
        &self.core_state.registry
    }
}
