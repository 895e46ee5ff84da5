#![forbid(unsafe_code)]

use super::*;
use gp_core::model::Status;
use rusqlite::{OptionalExtension, Row, params};
use serde_json::json;

const PROJECT_COLUMNS: &str = "id, user_id, title, description, reward_id, \
     sponsored_goal_id, enrollment_id, is_active, status, created_at_ms, updated_at_ms";

type RawProject = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    i64,
    String,
    i64,
    i64,
);

fn read_project(row: &Row<'_>) -> rusqlite::Result<RawProject> {
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
        row.get(10)?,
    ))
}

fn build_project(raw: RawProject) -> Result<ProjectRow, StoreError> {
    let (
        id,
        user_id,
        title,
        description,
        reward_id,
        sponsored_goal_id,
        enrollment_id,
        is_active,
        status,
        created_at_ms,
        updated_at_ms,
    ) = raw;
    Ok(ProjectRow {
        id,
        user_id,
        title,
        description,
        reward_id,
        sponsored_goal_id,
        enrollment_id,
        is_active: is_active != 0,
        status: parse_status(&status)?,
        created_at_ms,
        updated_at_ms,
    })
}

impl SqliteStore {
    pub fn project_create(
        &mut self,
        request: ProjectCreateRequest,
    ) -> Result<ProjectRow, StoreError> {
        let ProjectCreateRequest {
            user_id,
            title,
            description,
            reward_id,
        } = request;

        let user_id = canonicalize_user(&user_id)?;
        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_reward_exists_tx(&tx, &reward_id)?;

        let seq = next_counter_tx(&tx, "project")?;
        let id = format!("PROJ-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO projects(id, user_id, title, description, reward_id,
                                 sponsored_goal_id, enrollment_id, is_active, status,
                                 created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, 1, ?6, ?7, ?7)
            "#,
            params![
                id,
                user_id,
                title,
                description,
                reward_id,
                Status::Pending.as_str(),
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "project.created",
            &json!({ "project_id": id, "user_id": user_id }),
        )?;

        tx.commit()?;
        Ok(ProjectRow {
            id,
            user_id,
            title,
            description,
            reward_id,
            sponsored_goal_id: None,
            enrollment_id: None,
            is_active: true,
            status: Status::Pending,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    pub fn project_get(&self, id: &str) -> Result<Option<ProjectRow>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                read_project,
            )
            .optional()?;

        raw.map(build_project).transpose()
    }

    pub fn project_list_by_user(&self, user_id: &str) -> Result<Vec<ProjectRow>, StoreError> {
        let user_id = canonicalize_user(user_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], read_project)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_project(row?)?);
        }
        Ok(out)
    }

    pub fn project_edit(&mut self, request: ProjectEditRequest) -> Result<ProjectRow, StoreError> {
        let ProjectEditRequest {
            id,
            title,
            description,
        } = request;

        if title.is_none() && description.is_none() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let row = tx
            .query_row(
                "SELECT title, description FROM projects WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let Some((current_title, current_description)) = row else {
            return Err(StoreError::UnknownProject);
        };

        let new_title = title.unwrap_or(current_title);
        let new_description = description.unwrap_or(current_description);

        tx.execute(
            "UPDATE projects SET title = ?2, description = ?3, updated_at_ms = ?4 WHERE id = ?1",
            params![id, new_title, new_description, now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "project.edited",
            &json!({ "project_id": id }),
        )?;

        tx.commit()?;
        self.project_get(&id)?.ok_or(StoreError::UnknownProject)
    }
}
