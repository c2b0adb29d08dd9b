use keyreel_core::{Config, SanitizedConfig, StorageConfig, WorkflowOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: WorkflowOrchestrator,
}

impl AppState {
    pub fn new(config: Config, orchestrator: WorkflowOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.config.storage
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator {
        &self.orchestrator
    }
}
