//! Stage plans: the ordered list of generation steps for a session.

mod types;

pub use types::{ClipRecord, StageKind, StagePlan, StageSpec};
