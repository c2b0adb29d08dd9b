//! Workflow sessions and the process-wide registry that owns them.

mod memory;
mod registry;
mod types;

pub use memory::InMemorySessionRegistry;
pub use registry::{SessionError, SessionRegistry, StatusUpdate};
pub use types::{SessionStatus, WorkflowSession};
