#![forbid(unsafe_code)]

use super::*;
use gp_core::model::Status;
use rusqlite::{OptionalExtension, Row, params};
use serde_json::json;

const TASK_COLUMNS: &str = "id, milestone_id, sprint_id, title, status, \
     starts_at_ms, ends_at_ms, points, created_at_ms, updated_at_ms";

type RawTask = (
    String,
    String,
    Option<String>,
    String,
    String,
    Option<i64>,
    Option<i64>,
    i64,
    i64,
    i64,
);

fn read_task(row: &Row<'_>) -> rusqlite::Result<RawTask> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn build_task(raw: RawTask) -> Result<TaskRow, StoreError> {
    let (
        id,
        milestone_id,
        sprint_id,
        title,
        status,
        starts_at_ms,
        ends_at_ms,
        points,
        created_at_ms,
        updated_at_ms,
    ) = raw;
    Ok(TaskRow {
        id,
        milestone_id,
        sprint_id,
        title,
        status: parse_status(&status)?,
        starts_at_ms,
        ends_at_ms,
        points,
        created_at_ms,
        updated_at_ms,
    })
}

impl SqliteStore {
    pub fn task_create(&mut self, request: TaskCreateRequest) -> Result<TaskRow, StoreError> {
        let TaskCreateRequest {
            milestone_id,
            sprint_id,
            title,
            points,
            starts_at_ms,
            ends_at_ms,
        } = request;

        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty"));
        }
        if points < 0 {
            return Err(StoreError::InvalidInput("points must not be negative"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        milestone_core_tx(&tx, &milestone_id)?;
        if let Some(sprint_id) = sprint_id.as_deref() {
            let sprint_milestone = sprint_milestone_tx(&tx, sprint_id)?;
            if sprint_milestone != milestone_id {
                return Err(StoreError::InvalidInput(
                    "sprint belongs to a different milestone",
                ));
            }
        }

        let seq = next_counter_tx(&tx, "task")?;
        let id = format!("TASK-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO tasks(id, milestone_id, sprint_id, title, status,
                              starts_at_ms, ends_at_ms, points, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                id,
                milestone_id,
                sprint_id,
                title,
                Status::Pending.as_str(),
                starts_at_ms,
                ends_at_ms,
                points,
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "task.created",
            &json!({ "task_id": id, "milestone_id": milestone_id }),
        )?;

        tx.commit()?;
        Ok(TaskRow {
            id,
            milestone_id,
            sprint_id,
            title,
            status: Status::Pending,
            starts_at_ms,
            ends_at_ms,
            points,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    pub fn task_get(&self, id: &str) -> Result<Option<TaskRow>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                read_task,
            )
            .optional()?;

        raw.map(build_task).transpose()
    }

    pub fn task_list_by_milestone(&self, milestone_id: &str) -> Result<Vec<TaskRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE milestone_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![milestone_id], read_task)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_task(row?)?);
        }
        Ok(out)
    }

    pub fn task_list_by_sprint(&self, sprint_id: &str) -> Result<Vec<TaskRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE sprint_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![sprint_id], read_task)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_task(row?)?);
        }
        Ok(out)
    }

    pub fn task_edit(&mut self, request: TaskEditRequest) -> Result<TaskRow, StoreError> {
        let TaskEditRequest {
            id,
            title,
            sprint_id,
            points,
            starts_at_ms,
            ends_at_ms,
        } = request;

        if title.is_none()
            && sprint_id.is_none()
            && points.is_none()
            && starts_at_ms.is_none()
            && ends_at_ms.is_none()
        {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        if points.is_some_and(|points| points < 0) {
            return Err(StoreError::InvalidInput("points must not be negative"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let row = tx
            .query_row(
                r#"
                SELECT milestone_id, sprint_id, title, points, starts_at_ms, ends_at_ms
                FROM tasks
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            milestone_id,
            current_sprint_id,
            current_title,
            current_points,
            current_starts,
            current_ends,
        )) = row
        else {
            return Err(StoreError::UnknownTask);
        };

        let new_sprint_id = sprint_id.unwrap_or(current_sprint_id);
        if let Some(sprint_id) = new_sprint_id.as_deref() {
            let sprint_milestone = sprint_milestone_tx(&tx, sprint_id)?;
            if sprint_milestone != milestone_id {
                return Err(StoreError::InvalidInput(
                    "sprint belongs to a different milestone",
                ));
            }
        }

        let new_title = title.unwrap_or(current_title);
        let new_points = points.unwrap_or(current_points);
        let new_starts = starts_at_ms.unwrap_or(current_starts);
        let new_ends = ends_at_ms.unwrap_or(current_ends);

        tx.execute(
            r#"
            UPDATE tasks
            SET sprint_id = ?2, title = ?3, points = ?4,
                starts_at_ms = ?5, ends_at_ms = ?6, updated_at_ms = ?7
            WHERE id = ?1
            "#,
            params![
                id,
                new_sprint_id,
                new_title,
                new_points,
                new_starts,
                new_ends,
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "task.edited",
            &json!({ "task_id": id }),
        )?;

        tx.commit()?;
        self.task_get(&id)?.ok_or(StoreError::UnknownTask)
    }
}
