#![forbid(unsafe_code)]

use super::EngineError;
use crate::Engine;
use gp_storage::{
    MilestoneStatusChange, ProjectStatusChange, Settlement, SqliteStore, TaskStatusChange,
};

/// The level at which a cascade run stopped on failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CascadeStage {
    Task,
    Milestone,
    Project,
    Settlement,
}

impl CascadeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CascadeStage::Task => "task",
            CascadeStage::Milestone => "milestone",
            CascadeStage::Project => "project",
            CascadeStage::Settlement => "settlement",
        }
    }
}

/// What one cascade run changed, level by level. Each stage is its own
/// committed transaction; a stage that reported no change stops the
/// chain, so a fully populated report only occurs when the leaf change
/// rippled all the way up.
#[derive(Clone, Debug, Default)]
pub struct CascadeReport {
    pub task: Option<TaskStatusChange>,
    pub milestone: Option<MilestoneStatusChange>,
    pub project: Option<ProjectStatusChange>,
    pub settlement: Option<Settlement>,
}

fn at_stage(stage: CascadeStage) -> impl FnOnce(gp_storage::StoreError) -> EngineError {
    move |source| EngineError::Cascade { stage, source }
}

/// Run the full chain starting at a task whose checklist just changed.
/// The leaf write has already committed, so every stage failure here is
/// a cascade error.
pub(crate) fn cascade_from_task(
    store: &mut SqliteStore,
    task_id: &str,
) -> Result<CascadeReport, EngineError> {
    let mut report = CascadeReport::default();
    let change = store
        .task_status_recompute(task_id)
        .map_err(at_stage(CascadeStage::Task))?;
    let Some(change) = change else {
        return Ok(report);
    };
    let milestone_id = change.milestone_id.clone();
    report.task = Some(change);
    continue_from_milestone(store, &milestone_id, &mut report)?;
    Ok(report)
}

pub(crate) fn continue_from_milestone(
    store: &mut SqliteStore,
    milestone_id: &str,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let change = store
        .milestone_status_recompute(milestone_id, None)
        .map_err(at_stage(CascadeStage::Milestone))?;
    let Some(change) = change else {
        return Ok(());
    };
    let project_id = change.project_id.clone();
    report.milestone = Some(change);
    continue_from_project(store, &project_id, report)
}

pub(crate) fn continue_from_project(
    store: &mut SqliteStore,
    project_id: &str,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let change = store
        .project_status_recompute(project_id)
        .map_err(at_stage(CascadeStage::Project))?;
    let Some(change) = change else {
        return Ok(());
    };
    let entered_completed = change.entered_completed();
    let user_id = change.user_id.clone();
    let reward_id = change.reward_id.clone();
    report.project = Some(change);

    if entered_completed {
        let settlement = store
            .reward_settle(&user_id, &reward_id)
            .map_err(at_stage(CascadeStage::Settlement))?;
        report.settlement = Some(settlement);
    }
    Ok(())
}

impl Engine {
    /// Retriggerable recovery entry: recompute a task's chain from
    /// scratch. A missing task is a plain not-found error; nothing has
    /// been committed at that point.
    pub fn recompute_task(&mut self, task_id: &str) -> Result<CascadeReport, EngineError> {
        let mut report = CascadeReport::default();
        let change = self
            .store_mut()
            .task_status_recompute(task_id)
            .map_err(EngineError::Store)?;
        let Some(change) = change else {
            return Ok(report);
        };
        let milestone_id = change.milestone_id.clone();
        report.task = Some(change);
        continue_from_milestone(self.store_mut(), &milestone_id, &mut report)?;
        Ok(report)
    }

    /// Retriggerable recovery entry: recompute a project's status and
    /// settle if it enters completed.
    pub fn recompute_project(&mut self, project_id: &str) -> Result<CascadeReport, EngineError> {
        let mut report = CascadeReport::default();
        let change = self
            .store_mut()
            .project_status_recompute(project_id)
            .map_err(EngineError::Store)?;
        let Some(change) = change else {
            return Ok(report);
        };
        let entered_completed = change.entered_completed();
        let user_id = change.user_id.clone();
        let reward_id = change.reward_id.clone();
        report.project = Some(change);

        if entered_completed {
            let settlement = self
                .store_mut()
                .reward_settle(&user_id, &reward_id)
                .map_err(at_stage(CascadeStage::Settlement))?;
            report.settlement = Some(settlement);
        }
        Ok(report)
    }
}
