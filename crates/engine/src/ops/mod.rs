#![forbid(unsafe_code)]

mod checklist;
mod deletes;
mod enroll;
mod pipeline;
mod verify;

pub use checklist::{ChecklistDeletion, ChecklistMutation};
pub use deletes::{MilestoneDeletion, TaskDeletion};
pub use pipeline::{CascadeReport, CascadeStage};

use gp_storage::StoreError;

/// Errors surfaced to the presentation layer. `Cascade` means some
/// lower-level writes already committed and recomputation is
/// incomplete; the recompute entry points recover from that state.
#[derive(Debug)]
pub enum EngineError {
    Store(StoreError),
    Cascade {
        stage: CascadeStage,
        source: StoreError,
    },
}

impl EngineError {
    /// Stable string code for transport-layer mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cascade { .. } => "CASCADE_INCOMPLETE",
            Self::Store(err) => store_code(err),
        }
    }
}

fn store_code(err: &StoreError) -> &'static str {
    match err {
        StoreError::UnknownProject
        | StoreError::UnknownMilestone
        | StoreError::UnknownSprint
        | StoreError::UnknownTask
        | StoreError::UnknownChecklistItem
        | StoreError::UnknownGoal
        | StoreError::UnknownEnrollment
        | StoreError::UnknownReward
        | StoreError::UnknownUserReward => "NOT_FOUND",
        StoreError::DuplicateEnrollment => "CONFLICT",
        StoreError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
        StoreError::GoalNotAvailable => "GOAL_NOT_AVAILABLE",
        StoreError::Forbidden(_) | StoreError::NotSponsored => "FORBIDDEN",
        StoreError::InvalidInput(_) => "INVALID_INPUT",
        StoreError::Io(_) | StoreError::Sql(_) | StoreError::OrphanedChecklistItem { .. } => {
            "INTERNAL"
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Cascade { stage, source } => {
                write!(
                    f,
                    "cascade incomplete at {} stage: {source}",
                    stage.as_str()
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
