#![forbid(unsafe_code)]

use super::*;
use gp_core::derive::{
    ChecklistFact, derive_milestone_status, derive_project_status, derive_task_status,
};
use gp_core::model::{Status, Verification};
use rusqlite::params;
use serde_json::json;

impl SqliteStore {
    /// Recompute a task's status from its checklist items. Persists and
    /// journals only when the status actually changed; an unchanged
    /// status is a no-op and stops the cascade.
    pub fn task_status_recompute(
        &mut self,
        task_id: &str,
    ) -> Result<Option<TaskStatusChange>, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let (milestone_id, old) = task_core_tx(&tx, task_id)?;

        let mut stmt =
            tx.prepare("SELECT required, checked FROM checklist_items WHERE task_id = ?1")?;
        let facts = stmt
            .query_map(params![task_id], |row| {
                Ok(ChecklistFact {
                    required: row.get::<_, i64>(0)? != 0,
                    checked: row.get::<_, i64>(1)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let new = derive_task_status(&facts);
        if new == old {
            return Ok(None);
        }

        tx.execute(
            "UPDATE tasks SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![task_id, new.as_str(), now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(task_id),
            "task.status",
            &json!({
                "task_id": task_id,
                "from": old.as_str(),
                "to": new.as_str(),
            }),
        )?;

        tx.commit()?;
        Ok(Some(TaskStatusChange {
            task_id: task_id.to_string(),
            milestone_id,
            old,
            new,
        }))
    }

    /// Recompute a milestone's status from its task counts. When
    /// `counts` is absent, every task under the milestone is counted,
    /// sprint-bound or not. Sponsored milestones hold at in-progress on
    /// full completion until the sponsor verifies.
    pub fn milestone_status_recompute(
        &mut self,
        milestone_id: &str,
        counts: Option<TaskCounts>,
    ) -> Result<Option<MilestoneStatusChange>, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let (project_id, old) = milestone_core_tx(&tx, milestone_id)?;
        let project = project_core_tx(&tx, &project_id)?;
        let sponsored = project.sponsored_goal_id.is_some();

        let TaskCounts { completed, total } = match counts {
            Some(counts) => counts,
            None => TaskCounts {
                completed: count_tx(
                    &tx,
                    "SELECT COUNT(*) FROM tasks WHERE milestone_id = ?1 AND status = 'completed'",
                    milestone_id,
                )?,
                total: count_tx(
                    &tx,
                    "SELECT COUNT(*) FROM tasks WHERE milestone_id = ?1",
                    milestone_id,
                )?,
            },
        };

        let new = derive_milestone_status(completed, total, sponsored);
        if new == old {
            return Ok(None);
        }

        tx.execute(
            "UPDATE milestones SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![milestone_id, new.as_str(), now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(milestone_id),
            "milestone.status",
            &json!({
                "milestone_id": milestone_id,
                "from": old.as_str(),
                "to": new.as_str(),
                "completed_tasks": completed,
                "total_tasks": total,
            }),
        )?;

        tx.commit()?;
        Ok(Some(MilestoneStatusChange {
            milestone_id: milestone_id.to_string(),
            project_id,
            old,
            new,
        }))
    }

    /// Recompute a project's status from its milestones. The returned
    /// change carries `(user_id, reward_id)` so the caller can settle
    /// the reward when the project entered completed. Settlement is a
    /// separate transaction: the status write here is never rolled back
    /// by a settlement failure.
    pub fn project_status_recompute(
        &mut self,
        project_id: &str,
    ) -> Result<Option<ProjectStatusChange>, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let project = project_core_tx(&tx, project_id)?;
        let old = project.status;

        let mut stmt = tx.prepare("SELECT status FROM milestones WHERE project_id = ?1")?;
        let statuses = stmt
            .query_map(params![project_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut milestones = Vec::with_capacity(statuses.len());
        for status in &statuses {
            milestones.push(parse_status(status)?);
        }

        let new = derive_project_status(&milestones);
        if new == old {
            return Ok(None);
        }

        tx.execute(
            "UPDATE projects SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![project_id, new.as_str(), now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(project_id),
            "project.status",
            &json!({
                "project_id": project_id,
                "from": old.as_str(),
                "to": new.as_str(),
            }),
        )?;

        tx.commit()?;
        Ok(Some(ProjectStatusChange {
            project_id: project_id.to_string(),
            user_id: project.user_id,
            reward_id: project.reward_id,
            old,
            new,
        }))
    }

    /// Sponsor override for a sponsored milestone held at in-progress.
    /// Only the owner of the goal behind the project may verify, and
    /// only when the goal's verification method is manual. Verifying an
    /// already-completed milestone is a no-op.
    pub fn milestone_verify(
        &mut self,
        sponsor_id: &str,
        milestone_id: &str,
    ) -> Result<Option<MilestoneStatusChange>, StoreError> {
        let sponsor_id = canonicalize_user(sponsor_id)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let (project_id, old) = milestone_core_tx(&tx, milestone_id)?;
        let project = project_core_tx(&tx, &project_id)?;

        let Some(goal_id) = project.sponsored_goal_id.as_deref() else {
            return Err(StoreError::NotSponsored);
        };
        let goal = goal_core_tx(&tx, goal_id)?;
        if goal.sponsor_id != sponsor_id {
            return Err(StoreError::Forbidden(
                "only the sponsoring owner may verify a milestone",
            ));
        }
        if goal.verification != Verification::Manual {
            return Err(StoreError::Forbidden(
                "goal verification method is not manual",
            ));
        }

        if old == Status::Completed {
            return Ok(None);
        }

        tx.execute(
            "UPDATE milestones SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![milestone_id, Status::Completed.as_str(), now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(milestone_id),
            "milestone.verified",
            &json!({
                "milestone_id": milestone_id,
                "sponsor_id": sponsor_id,
                "from": old.as_str(),
                "to": Status::Completed.as_str(),
            }),
        )?;

        tx.commit()?;
        Ok(Some(MilestoneStatusChange {
            milestone_id: milestone_id.to_string(),
            project_id,
            old,
            new: Status::Completed,
        }))
    }
}
