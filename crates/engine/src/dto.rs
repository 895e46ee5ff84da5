#![forbid(unsafe_code)]

use crate::ops::{CascadeReport, ChecklistMutation, EngineError};
use crate::support::time::ts_ms_to_rfc3339;
use gp_storage::{ChecklistItemRow, EnrollmentOutcome, Settlement, UserRewardRow};
use serde::Serialize;

/// Wire shape for engine errors: a stable code plus a human-readable
/// message.
#[derive(Clone, Debug, Serialize)]
pub struct OpError {
    pub code: String,
    pub message: String,
}

impl From<&EngineError> for OpError {
    fn from(value: &EngineError) -> Self {
        Self {
            code: value.code().to_string(),
            message: value.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusChangeDto {
    pub id: String,
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SettlementDto {
    pub user_reward_id: String,
    pub user_id: String,
    pub reward_id: String,
    pub status: String,
    pub newly_claimed: bool,
}

impl From<&Settlement> for SettlementDto {
    fn from(value: &Settlement) -> Self {
        Self {
            user_reward_id: value.user_reward_id.clone(),
            user_id: value.user_id.clone(),
            reward_id: value.reward_id.clone(),
            status: value.status.as_str().to_string(),
            newly_claimed: value.newly_claimed,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CascadeDto {
    pub task: Option<StatusChangeDto>,
    pub milestone: Option<StatusChangeDto>,
    pub project: Option<StatusChangeDto>,
    pub settlement: Option<SettlementDto>,
}

impl From<&CascadeReport> for CascadeDto {
    fn from(value: &CascadeReport) -> Self {
        Self {
            task: value.task.as_ref().map(|change| StatusChangeDto {
                id: change.task_id.clone(),
                from: change.old.as_str().to_string(),
                to: change.new.as_str().to_string(),
            }),
            milestone: value.milestone.as_ref().map(|change| StatusChangeDto {
                id: change.milestone_id.clone(),
                from: change.old.as_str().to_string(),
                to: change.new.as_str().to_string(),
            }),
            project: value.project.as_ref().map(|change| StatusChangeDto {
                id: change.project_id.clone(),
                from: change.old.as_str().to_string(),
                to: change.new.as_str().to_string(),
            }),
            settlement: value.settlement.as_ref().map(SettlementDto::from),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChecklistItemDto {
    pub id: String,
    pub task_id: Option<String>,
    pub goal_id: Option<String>,
    pub description: String,
    pub required: bool,
    pub checked: bool,
    pub created_at: String,
}

impl From<&ChecklistItemRow> for ChecklistItemDto {
    fn from(value: &ChecklistItemRow) -> Self {
        Self {
            id: value.id.clone(),
            task_id: value.owner.task_id().map(str::to_string),
            goal_id: value.owner.goal_id().map(str::to_string),
            description: value.description.clone(),
            required: value.required,
            checked: value.checked,
            created_at: ts_ms_to_rfc3339(value.created_at_ms),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChecklistMutationDto {
    pub item: ChecklistItemDto,
    pub cascade: CascadeDto,
}

impl From<&ChecklistMutation> for ChecklistMutationDto {
    fn from(value: &ChecklistMutation) -> Self {
        Self {
            item: ChecklistItemDto::from(&value.item),
            cascade: CascadeDto::from(&value.cascade),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EnrollmentDto {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub status: String,
    pub project_id: String,
    pub created_at: String,
}

impl From<&EnrollmentOutcome> for EnrollmentDto {
    fn from(value: &EnrollmentOutcome) -> Self {
        Self {
            id: value.enrollment.id.clone(),
            user_id: value.enrollment.user_id.clone(),
            goal_id: value.enrollment.goal_id.clone(),
            status: value.enrollment.status.as_str().to_string(),
            project_id: value.project_id.clone(),
            created_at: ts_ms_to_rfc3339(value.enrollment.created_at_ms),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UserRewardDto {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub status: String,
    pub claimed_at: Option<String>,
    pub delivered_at: Option<String>,
}

impl From<&UserRewardRow> for UserRewardDto {
    fn from(value: &UserRewardRow) -> Self {
        Self {
            id: value.id.clone(),
            user_id: value.user_id.clone(),
            reward_id: value.reward_id.clone(),
            status: value.status.as_str().to_string(),
            claimed_at: value.claimed_at_ms.map(ts_ms_to_rfc3339),
            delivered_at: value.delivered_at_ms.map(ts_ms_to_rfc3339),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gp_core::model::{ChecklistOwner, RewardStatus};
    use serde_json::json;

    #[test]
    fn checklist_item_dto_flattens_the_owner() {
        let row = ChecklistItemRow {
            id: "ITEM-001".to_string(),
            owner: ChecklistOwner::Task("TASK-001".to_string()),
            description: "Stretch".to_string(),
            required: true,
            checked: false,
            created_at_ms: 0,
        };
        let dto = ChecklistItemDto::from(&row);
        assert_eq!(
            serde_json::to_value(&dto).expect("serialize"),
            json!({
                "id": "ITEM-001",
                "task_id": "TASK-001",
                "goal_id": null,
                "description": "Stretch",
                "required": true,
                "checked": false,
                "created_at": "1970-01-01T00:00:00Z",
            })
        );
    }

    #[test]
    fn settlement_dto_carries_the_claim() {
        let settlement = Settlement {
            user_reward_id: "UR-001".to_string(),
            user_id: "runner-7".to_string(),
            reward_id: "RWD-001".to_string(),
            previous: None,
            status: RewardStatus::Claimed,
            newly_claimed: true,
        };
        let dto = SettlementDto::from(&settlement);
        assert_eq!(dto.status, "claimed");
        assert!(dto.newly_claimed);
    }
}
