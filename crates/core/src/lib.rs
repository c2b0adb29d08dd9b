pub mod assembler;
pub mod config;
pub mod gate;
pub mod metrics;
pub mod orchestrator;
pub mod plan;
pub mod provider;
pub mod session;
pub mod stage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use assembler::{Assembler, AssemblerConfig, AssemblerError, FfmpegAssembler};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, PublicConfig,
    SanitizedConfig, ServerConfig, StorageConfig,
};
pub use gate::{ConcurrencyGate, GateError, GatePermit, GateStatus};
pub use orchestrator::{
    OrchestratorError, OrchestratorStatus, SessionCounts, StartOutcome, WorkflowConfig,
    WorkflowOrchestrator,
};
pub use plan::{ClipRecord, StageKind, StagePlan, StageSpec};
pub use provider::{
    ApimartClient, GeminiImageClient, GenerationProvider, GenerationRequest, ImageGenerator,
    JobOutcome, JobPoller, PollFailure, ProviderError, PublicUrlResolver,
};
pub use session::{
    InMemorySessionRegistry, SessionError, SessionRegistry, SessionStatus, StatusUpdate,
    WorkflowSession,
};
pub use stage::{StageArtifact, StageContext, StageFailure, StageOutcome, StageRunner};
