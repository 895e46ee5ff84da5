#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use serde_json::json;

impl SqliteStore {
    pub fn sprint_create(&mut self, request: SprintCreateRequest) -> Result<SprintRow, StoreError> {
        let SprintCreateRequest {
            milestone_id,
            title,
            starts_at_ms,
            ends_at_ms,
        } = request;

        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        milestone_core_tx(&tx, &milestone_id)?;

        let seq = next_counter_tx(&tx, "sprint")?;
        let id = format!("SPR-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO sprints(id, milestone_id, title, starts_at_ms, ends_at_ms, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![id, milestone_id, title, starts_at_ms, ends_at_ms, now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "sprint.created",
            &json!({ "sprint_id": id, "milestone_id": milestone_id }),
        )?;

        tx.commit()?;
        Ok(SprintRow {
            id,
            milestone_id,
            title,
            starts_at_ms,
            ends_at_ms,
            created_at_ms: now_ms,
        })
    }

    pub fn sprint_get(&self, id: &str) -> Result<Option<SprintRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, milestone_id, title, starts_at_ms, ends_at_ms, created_at_ms
                FROM sprints
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(SprintRow {
                        id: row.get(0)?,
                        milestone_id: row.get(1)?,
                        title: row.get(2)?,
                        starts_at_ms: row.get(3)?,
                        ends_at_ms: row.get(4)?,
                        created_at_ms: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn sprint_list_by_milestone(
        &self,
        milestone_id: &str,
    ) -> Result<Vec<SprintRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, milestone_id, title, starts_at_ms, ends_at_ms, created_at_ms
            FROM sprints
            WHERE milestone_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![milestone_id], |row| {
            Ok(SprintRow {
                id: row.get(0)?,
                milestone_id: row.get(1)?,
                title: row.get(2)?,
                starts_at_ms: row.get(3)?,
                ends_at_ms: row.get(4)?,
                created_at_ms: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
