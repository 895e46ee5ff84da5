#![forbid(unsafe_code)]

use super::*;
use gp_core::model::EnrollmentStatus;
use rusqlite::{OptionalExtension, Transaction, params};
use serde_json::json;

impl SqliteStore {
    /// Delete a project and everything under it. Ownership is verified
    /// once, before the first delete. Releases the linked enrollment
    /// (if any) back to inactive.
    pub fn project_delete(
        &mut self,
        actor: &str,
        project_id: &str,
    ) -> Result<ProjectDeleteReport, StoreError> {
        let actor = canonicalize_user(actor)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let project = project_core_tx(&tx, project_id)?;
        if project.user_id != actor {
            return Err(StoreError::Forbidden("project is owned by another user"));
        }

        let is_template = tx
            .query_row(
                "SELECT 1 FROM sponsored_goals WHERE project_id = ?1",
                params![project_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if is_template {
            return Err(StoreError::InvalidInput(
                "project is the template of a sponsored goal",
            ));
        }

        let milestone_ids = milestone_ids_tx(&tx, project_id)?;
        let mut counts = CascadeCounts::default();
        for milestone_id in &milestone_ids {
            delete_milestone_children_tx(&tx, milestone_id, &mut counts)?;
            tx.execute("DELETE FROM milestones WHERE id = ?1", params![milestone_id])?;
        }

        tx.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;

        let released_enrollment_id = project.enrollment_id;
        if let Some(enrollment_id) = released_enrollment_id.as_deref() {
            tx.execute(
                "UPDATE enrollments SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
                params![enrollment_id, EnrollmentStatus::Inactive.as_str(), now_ms],
            )?;
        }

        insert_event_tx(
            &tx,
            now_ms,
            Some(project_id),
            "project.deleted",
            &json!({
                "project_id": project_id,
                "milestones": milestone_ids.len(),
                "sprints": counts.sprints,
                "tasks": counts.tasks,
                "checklist_items": counts.checklist_items,
                "reviews": counts.reviews,
                "retrospectives": counts.retrospectives,
                "daily_entries": counts.daily_entries,
            }),
        )?;

        tx.commit()?;
        Ok(ProjectDeleteReport {
            project_id: project_id.to_string(),
            milestones: milestone_ids.len() as u64,
            counts,
            released_enrollment_id,
        })
    }

    /// Delete a milestone and its dependents: per sprint its review,
    /// retrospective, and daily entries, then the sprint; per task its
    /// checklist items and daily entries, then the task. The caller
    /// recomputes the owning project afterwards.
    pub fn milestone_delete(
        &mut self,
        actor: &str,
        milestone_id: &str,
    ) -> Result<MilestoneDeleteReport, StoreError> {
        let actor = canonicalize_user(actor)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let (project_id, _) = milestone_core_tx(&tx, milestone_id)?;
        let project = project_core_tx(&tx, &project_id)?;
        if project.user_id != actor {
            return Err(StoreError::Forbidden("project is owned by another user"));
        }

        let mut counts = CascadeCounts::default();
        delete_milestone_children_tx(&tx, milestone_id, &mut counts)?;
        tx.execute("DELETE FROM milestones WHERE id = ?1", params![milestone_id])?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(milestone_id),
            "milestone.deleted",
            &json!({
                "milestone_id": milestone_id,
                "project_id": project_id,
                "sprints": counts.sprints,
                "tasks": counts.tasks,
                "checklist_items": counts.checklist_items,
                "reviews": counts.reviews,
                "retrospectives": counts.retrospectives,
                "daily_entries": counts.daily_entries,
            }),
        )?;

        tx.commit()?;
        Ok(MilestoneDeleteReport {
            milestone_id: milestone_id.to_string(),
            project_id,
            counts,
        })
    }

    /// Delete a sprint. Its review, retrospective, and daily entries go
    /// with it; its tasks are detached, not deleted, because tasks
    /// belong to the milestone.
    pub fn sprint_delete(
        &mut self,
        actor: &str,
        sprint_id: &str,
    ) -> Result<SprintDeleteReport, StoreError> {
        let actor = canonicalize_user(actor)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let milestone_id = sprint_milestone_tx(&tx, sprint_id)?;
        let (project_id, _) = milestone_core_tx(&tx, &milestone_id)?;
        let project = project_core_tx(&tx, &project_id)?;
        if project.user_id != actor {
            return Err(StoreError::Forbidden("project is owned by another user"));
        }

        let reviews = tx.execute("DELETE FROM reviews WHERE sprint_id = ?1", params![sprint_id])?;
        let retrospectives = tx.execute(
            "DELETE FROM retrospectives WHERE sprint_id = ?1",
            params![sprint_id],
        )?;
        let daily_entries = tx.execute(
            "DELETE FROM daily_entries WHERE sprint_id = ?1",
            params![sprint_id],
        )?;
        let detached_tasks = tx.execute(
            "UPDATE tasks SET sprint_id = NULL, updated_at_ms = ?2 WHERE sprint_id = ?1",
            params![sprint_id, now_ms],
        )?;
        tx.execute("DELETE FROM sprints WHERE id = ?1", params![sprint_id])?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(sprint_id),
            "sprint.deleted",
            &json!({
                "sprint_id": sprint_id,
                "milestone_id": milestone_id,
                "detached_tasks": detached_tasks,
                "reviews": reviews,
                "retrospectives": retrospectives,
                "daily_entries": daily_entries,
            }),
        )?;

        tx.commit()?;
        Ok(SprintDeleteReport {
            sprint_id: sprint_id.to_string(),
            milestone_id,
            detached_tasks: detached_tasks as u64,
            reviews: reviews as u64,
            retrospectives: retrospectives as u64,
            daily_entries: daily_entries as u64,
        })
    }

    /// Delete a task with its checklist items and task-keyed daily
    /// entries. The caller recomputes the owning milestone afterwards.
    pub fn task_delete(
        &mut self,
        actor: &str,
        task_id: &str,
    ) -> Result<TaskDeleteReport, StoreError> {
        let actor = canonicalize_user(actor)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let (milestone_id, _) = task_core_tx(&tx, task_id)?;
        let (project_id, _) = milestone_core_tx(&tx, &milestone_id)?;
        let project = project_core_tx(&tx, &project_id)?;
        if project.user_id != actor {
            return Err(StoreError::Forbidden("project is owned by another user"));
        }

        let (checklist_items, daily_entries) = delete_task_children_tx(&tx, task_id)?;
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(task_id),
            "task.deleted",
            &json!({
                "task_id": task_id,
                "milestone_id": milestone_id,
                "checklist_items": checklist_items,
                "daily_entries": daily_entries,
            }),
        )?;

        tx.commit()?;
        Ok(TaskDeleteReport {
            task_id: task_id.to_string(),
            milestone_id,
            checklist_items,
            daily_entries,
        })
    }
}

fn milestone_ids_tx(tx: &Transaction<'_>, project_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT id FROM milestones WHERE project_id = ?1 ORDER BY id ASC")?;
    let ids = stmt
        .query_map(params![project_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn delete_milestone_children_tx(
    tx: &Transaction<'_>,
    milestone_id: &str,
    counts: &mut CascadeCounts,
) -> Result<(), StoreError> {
    let mut sprint_stmt =
        tx.prepare("SELECT id FROM sprints WHERE milestone_id = ?1 ORDER BY id ASC")?;
    let sprint_ids = sprint_stmt
        .query_map(params![milestone_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(sprint_stmt);

    for sprint_id in &sprint_ids {
        counts.reviews +=
            tx.execute("DELETE FROM reviews WHERE sprint_id = ?1", params![sprint_id])? as u64;
        counts.retrospectives += tx.execute(
            "DELETE FROM retrospectives WHERE sprint_id = ?1",
            params![sprint_id],
        )? as u64;
        counts.daily_entries += tx.execute(
            "DELETE FROM daily_entries WHERE sprint_id = ?1",
            params![sprint_id],
        )? as u64;
        // The milestone's tasks are deleted below; detach them first so
        // the sprint row can go.
        tx.execute(
            "UPDATE tasks SET sprint_id = NULL WHERE sprint_id = ?1",
            params![sprint_id],
        )?;
        tx.execute("DELETE FROM sprints WHERE id = ?1", params![sprint_id])?;
        counts.sprints += 1;
    }

    let mut task_stmt =
        tx.prepare("SELECT id FROM tasks WHERE milestone_id = ?1 ORDER BY id ASC")?;
    let task_ids = task_stmt
        .query_map(params![milestone_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(task_stmt);

    for task_id in &task_ids {
        let (checklist_items, daily_entries) = delete_task_children_tx(tx, task_id)?;
        counts.checklist_items += checklist_items;
        counts.daily_entries += daily_entries;
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        counts.tasks += 1;
    }

    Ok(())
}

fn delete_task_children_tx(
    tx: &Transaction<'_>,
    task_id: &str,
) -> Result<(u64, u64), StoreError> {
    let checklist_items = tx.execute(
        "DELETE FROM checklist_items WHERE task_id = ?1",
        params![task_id],
    )? as u64;
    let daily_entries = tx.execute(
        "DELETE FROM daily_entries WHERE task_id = ?1",
        params![task_id],
    )? as u64;
    Ok((checklist_items, daily_entries))
}
