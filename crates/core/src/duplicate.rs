#![forbid(unsafe_code)]

use crate::ids::UserId;
use crate::model::Status;

/// Snapshot of a sponsored goal's template hierarchy, as currently
/// stored. Carries the live status/checked fields so the copy can be
/// seen to reset them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateProject {
    pub title: String,
    pub description: Option<String>,
    pub reward_id: String,
    pub status: Status,
    pub milestones: Vec<TemplateMilestone>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateMilestone {
    pub title: String,
    pub reward_id: Option<String>,
    pub status: Status,
    pub tasks: Vec<TemplateTask>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateTask {
    pub title: String,
    pub status: Status,
    pub sprint_id: Option<String>,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
    pub points: i64,
    pub items: Vec<TemplateChecklistItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateChecklistItem {
    pub description: String,
    pub required: bool,
    pub checked: bool,
}

/// The hierarchy to insert for one enrollment. Ids are assigned by the
/// store at insert time; nothing here references the template rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectCopy {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub reward_id: String,
    pub sponsored_goal_id: String,
    pub enrollment_id: String,
    pub is_active: bool,
    pub status: Status,
    pub milestones: Vec<MilestoneCopy>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneCopy {
    pub title: String,
    pub reward_id: Option<String>,
    pub status: Status,
    pub tasks: Vec<TaskCopy>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCopy {
    pub title: String,
    pub status: Status,
    pub sprint_id: Option<String>,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
    pub points: i64,
    pub items: Vec<ChecklistItemCopy>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecklistItemCopy {
    pub description: String,
    pub required: bool,
    pub checked: bool,
}

/// Plan an independent copy of a template hierarchy for one enrollee.
///
/// The project keeps the template's current status; milestones and
/// tasks reset to pending, tasks detach from the template's sprints,
/// and every checklist item starts unchecked. The result matches what
/// the derivers would compute for a hierarchy with zero checked items.
pub fn duplicate_project(
    template: &TemplateProject,
    user_id: &UserId,
    goal_id: &str,
    enrollment_id: &str,
) -> ProjectCopy {
    ProjectCopy {
        user_id: user_id.as_str().to_string(),
        title: template.title.clone(),
        description: template.description.clone(),
        reward_id: template.reward_id.clone(),
        sponsored_goal_id: goal_id.to_string(),
        enrollment_id: enrollment_id.to_string(),
        is_active: true,
        status: template.status,
        milestones: template
            .milestones
            .iter()
            .map(|milestone| MilestoneCopy {
                title: milestone.title.clone(),
                reward_id: milestone.reward_id.clone(),
                status: Status::Pending,
                tasks: milestone
                    .tasks
                    .iter()
                    .map(|task| TaskCopy {
                        title: task.title.clone(),
                        status: Status::Pending,
                        sprint_id: None,
                        starts_at_ms: task.starts_at_ms,
                        ends_at_ms: task.ends_at_ms,
                        points: task.points,
                        items: task
                            .items
                            .iter()
                            .map(|item| ChecklistItemCopy {
                                description: item.description.clone(),
                                required: item.required,
                                checked: false,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}
