#![forbid(unsafe_code)]

use super::EngineError;
use super::pipeline::{CascadeReport, continue_from_milestone, continue_from_project};
use crate::Engine;
use gp_storage::{
    MilestoneDeleteReport, ProjectDeleteReport, SprintDeleteReport, TaskDeleteReport,
};

/// A milestone deletion plus the project recompute it triggered. A
/// project whose milestones were all removed reverts to pending;
/// removing the last incomplete milestone can also complete it.
#[derive(Clone, Debug)]
pub struct MilestoneDeletion {
    pub report: MilestoneDeleteReport,
    pub cascade: CascadeReport,
}

#[derive(Clone, Debug)]
pub struct TaskDeletion {
    pub report: TaskDeleteReport,
    pub cascade: CascadeReport,
}

impl Engine {
    pub fn delete_project(
        &mut self,
        actor: &str,
        project_id: &str,
    ) -> Result<ProjectDeleteReport, EngineError> {
        self.store_mut()
            .project_delete(actor, project_id)
            .map_err(EngineError::Store)
    }

    pub fn delete_milestone(
        &mut self,
        actor: &str,
        milestone_id: &str,
    ) -> Result<MilestoneDeletion, EngineError> {
        let report = self
            .store_mut()
            .milestone_delete(actor, milestone_id)
            .map_err(EngineError::Store)?;
        let mut cascade = CascadeReport::default();
        let project_id = report.project_id.clone();
        continue_from_project(self.store_mut(), &project_id, &mut cascade)?;
        Ok(MilestoneDeletion { report, cascade })
    }

    /// Sprint deletion detaches tasks without touching their status, so
    /// no recompute follows.
    pub fn delete_sprint(
        &mut self,
        actor: &str,
        sprint_id: &str,
    ) -> Result<SprintDeleteReport, EngineError> {
        self.store_mut()
            .sprint_delete(actor, sprint_id)
            .map_err(EngineError::Store)
    }

    pub fn delete_task(
        &mut self,
        actor: &str,
        task_id: &str,
    ) -> Result<TaskDeletion, EngineError> {
        let report = self
            .store_mut()
            .task_delete(actor, task_id)
            .map_err(EngineError::Store)?;
        let mut cascade = CascadeReport::default();
        let milestone_id = report.milestone_id.clone();
        continue_from_milestone(self.store_mut(), &milestone_id, &mut cascade)?;
        Ok(TaskDeletion { report, cascade })
    }
}
