#![forbid(unsafe_code)]

use gp_core::model::{ChecklistOwner, EnrollmentStatus, RewardStatus, Status, Verification};

#[derive(Clone, Debug)]
pub struct ProjectRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub reward_id: String,
    pub sponsored_goal_id: Option<String>,
    pub enrollment_id: Option<String>,
    pub is_active: bool,
    pub status: Status,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl ProjectRow {
    pub fn is_sponsored(&self) -> bool {
        self.sponsored_goal_id.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct MilestoneRow {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub reward_id: Option<String>,
    pub status: Status,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct SprintRow {
    pub id: String,
    pub milestone_id: String,
    pub title: String,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct TaskRow {
    pub id: String,
    pub milestone_id: String,
    pub sprint_id: Option<String>,
    pub title: String,
    pub status: Status,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
    pub points: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ChecklistItemRow {
    pub id: String,
    pub owner: ChecklistOwner,
    pub description: String,
    pub required: bool,
    pub checked: bool,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct SponsoredGoalRow {
    pub id: String,
    pub sponsor_id: String,
    pub project_id: String,
    pub title: String,
    pub max_users: u32,
    pub verification: Verification,
    pub starts_at_ms: i64,
    pub ends_at_ms: i64,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct EnrollmentRow {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub status: EnrollmentStatus,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct RewardRow {
    pub id: String,
    pub title: String,
    pub points: i64,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct UserRewardRow {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub status: RewardStatus,
    pub claimed_at_ms: Option<i64>,
    pub delivered_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ReviewRow {
    pub id: String,
    pub sprint_id: String,
    pub summary: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct RetrospectiveRow {
    pub id: String,
    pub sprint_id: String,
    pub summary: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct DailyEntryRow {
    pub id: String,
    pub sprint_id: Option<String>,
    pub task_id: Option<String>,
    pub note: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct EventRow {
    pub seq: i64,
    pub ts_ms: i64,
    pub entity_id: Option<String>,
    pub event_type: String,
    pub payload_json: String,
}

impl EventRow {
    pub fn event_id(&self) -> String {
        format!("evt_{:016}", self.seq)
    }
}

/// Reported by a recompute operation when the stored status changed.
/// `None` from the operation means the cascade stops there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskStatusChange {
    pub task_id: String,
    pub milestone_id: String,
    pub old: Status,
    pub new: Status,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneStatusChange {
    pub milestone_id: String,
    pub project_id: String,
    pub old: Status,
    pub new: Status,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectStatusChange {
    pub project_id: String,
    pub user_id: String,
    pub reward_id: String,
    pub old: Status,
    pub new: Status,
}

impl ProjectStatusChange {
    pub fn entered_completed(&self) -> bool {
        self.new == Status::Completed && self.old != Status::Completed
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub user_reward_id: String,
    pub user_id: String,
    pub reward_id: String,
    pub previous: Option<RewardStatus>,
    pub status: RewardStatus,
    pub newly_claimed: bool,
}

#[derive(Clone, Debug)]
pub struct EnrollmentOutcome {
    pub enrollment: EnrollmentRow,
    pub project_id: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeCounts {
    pub sprints: u64,
    pub tasks: u64,
    pub checklist_items: u64,
    pub reviews: u64,
    pub retrospectives: u64,
    pub daily_entries: u64,
}

#[derive(Clone, Debug)]
pub struct ProjectDeleteReport {
    pub project_id: String,
    pub milestones: u64,
    pub counts: CascadeCounts,
    pub released_enrollment_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MilestoneDeleteReport {
    pub milestone_id: String,
    pub project_id: String,
    pub counts: CascadeCounts,
}

#[derive(Clone, Debug)]
pub struct SprintDeleteReport {
    pub sprint_id: String,
    pub milestone_id: String,
    pub detached_tasks: u64,
    pub reviews: u64,
    pub retrospectives: u64,
    pub daily_entries: u64,
}

#[derive(Clone, Debug)]
pub struct TaskDeleteReport {
    pub task_id: String,
    pub milestone_id: String,
    pub checklist_items: u64,
    pub daily_entries: u64,
}
