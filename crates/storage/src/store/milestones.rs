#![forbid(unsafe_code)]

use super::*;
use gp_core::model::Status;
use rusqlite::{OptionalExtension, Row, params};
use serde_json::json;

const MILESTONE_COLUMNS: &str =
    "id, project_id, title, reward_id, status, created_at_ms, updated_at_ms";

type RawMilestone = (String, String, String, Option<String>, String, i64, i64);

fn read_milestone(row: &Row<'_>) -> rusqlite::Result<RawMilestone> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn build_milestone(raw: RawMilestone) -> Result<MilestoneRow, StoreError> {
    let (id, project_id, title, reward_id, status, created_at_ms, updated_at_ms) = raw;
    Ok(MilestoneRow {
        id,
        project_id,
        title,
        reward_id,
        status: parse_status(&status)?,
        created_at_ms,
        updated_at_ms,
    })
}

impl SqliteStore {
    pub fn milestone_create(
        &mut self,
        request: MilestoneCreateRequest,
    ) -> Result<MilestoneRow, StoreError> {
        let MilestoneCreateRequest {
            project_id,
            title,
            reward_id,
        } = request;

        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        project_core_tx(&tx, &project_id)?;
        if let Some(reward_id) = reward_id.as_deref() {
            ensure_reward_exists_tx(&tx, reward_id)?;
        }

        let seq = next_counter_tx(&tx, "milestone")?;
        let id = format!("MS-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO milestones(id, project_id, title, reward_id, status,
                                   created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                id,
                project_id,
                title,
                reward_id,
                Status::Pending.as_str(),
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "milestone.created",
            &json!({ "milestone_id": id, "project_id": project_id }),
        )?;

        tx.commit()?;
        Ok(MilestoneRow {
            id,
            project_id,
            title,
            reward_id,
            status: Status::Pending,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    pub fn milestone_get(&self, id: &str) -> Result<Option<MilestoneRow>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?1"),
                params![id],
                read_milestone,
            )
            .optional()?;

        raw.map(build_milestone).transpose()
    }

    pub fn milestone_list_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<MilestoneRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE project_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![project_id], read_milestone)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_milestone(row?)?);
        }
        Ok(out)
    }

    pub fn milestone_edit(
        &mut self,
        request: MilestoneEditRequest,
    ) -> Result<MilestoneRow, StoreError> {
        let MilestoneEditRequest {
            id,
            title,
            reward_id,
        } = request;

        if title.is_none() && reward_id.is_none() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let row = tx
            .query_row(
                "SELECT title, reward_id FROM milestones WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let Some((current_title, current_reward_id)) = row else {
            return Err(StoreError::UnknownMilestone);
        };

        let new_title = title.unwrap_or(current_title);
        let new_reward_id = reward_id.unwrap_or(current_reward_id);
        if let Some(reward_id) = new_reward_id.as_deref() {
            ensure_reward_exists_tx(&tx, reward_id)?;
        }

        tx.execute(
            "UPDATE milestones SET title = ?2, reward_id = ?3, updated_at_ms = ?4 WHERE id = ?1",
            params![id, new_title, new_reward_id, now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "milestone.edited",
            &json!({ "milestone_id": id }),
        )?;

        tx.commit()?;
        self.milestone_get(&id)?.ok_or(StoreError::UnknownMilestone)
    }
}
