#![forbid(unsafe_code)]

use gp_core::model::{ChecklistOwner, EnrollmentStatus, Verification};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectCreateRequest {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub reward_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectEditRequest {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneCreateRequest {
    pub project_id: String,
    pub title: String,
    pub reward_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneEditRequest {
    pub id: String,
    pub title: Option<String>,
    pub reward_id: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SprintCreateRequest {
    pub milestone_id: String,
    pub title: String,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCreateRequest {
    pub milestone_id: String,
    pub sprint_id: Option<String>,
    pub title: String,
    pub points: i64,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
}

/// Status is deliberately absent: it is derived, never accepted as input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskEditRequest {
    pub id: String,
    pub title: Option<String>,
    pub sprint_id: Option<Option<String>>,
    pub points: Option<i64>,
    pub starts_at_ms: Option<Option<i64>>,
    pub ends_at_ms: Option<Option<i64>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecklistItemCreateRequest {
    pub actor: String,
    pub owner: ChecklistOwner,
    pub description: String,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecklistItemUpdateRequest {
    pub actor: String,
    pub id: String,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub checked: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardCreateRequest {
    pub title: String,
    pub points: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsoredGoalCreateRequest {
    pub sponsor_id: String,
    pub project_id: String,
    pub title: String,
    pub max_users: u32,
    pub verification: Verification,
    pub starts_at_ms: i64,
    pub ends_at_ms: i64,
}

/// Verification method and template project are fixed at publication;
/// only the presentation fields and the capacity window move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsoredGoalEditRequest {
    pub id: String,
    pub title: Option<String>,
    pub max_users: Option<u32>,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollRequest {
    pub user_id: String,
    pub goal_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentSetStatusRequest {
    pub id: String,
    pub status: EnrollmentStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewCreateRequest {
    pub sprint_id: String,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrospectiveCreateRequest {
    pub sprint_id: String,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyEntryCreateRequest {
    pub sprint_id: Option<String>,
    pub task_id: Option<String>,
    pub note: String,
}

/// Explicit completion counts for the milestone deriver. When absent,
/// the store counts every task under the milestone, sprint-bound or not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskCounts {
    pub completed: u64,
    pub total: u64,
}
