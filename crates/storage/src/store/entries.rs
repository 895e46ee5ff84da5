#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use serde_json::json;

impl SqliteStore {
    pub fn review_create(&mut self, request: ReviewCreateRequest) -> Result<ReviewRow, StoreError> {
        let ReviewCreateRequest { sprint_id, summary } = request;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        sprint_milestone_tx(&tx, &sprint_id)?;

        let seq = next_counter_tx(&tx, "review")?;
        let id = format!("REV-{:03}", seq);

        let insert = tx.execute(
            "INSERT INTO reviews(id, sprint_id, summary, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![id, sprint_id, summary, now_ms],
        );
        if let Err(err) = insert {
            if is_constraint_violation(&err) {
                return Err(StoreError::InvalidInput("sprint already has a review"));
            }
            return Err(StoreError::Sql(err));
        }

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "review.created",
            &json!({ "review_id": id, "sprint_id": sprint_id }),
        )?;

        tx.commit()?;
        Ok(ReviewRow {
            id,
            sprint_id,
            summary,
            created_at_ms: now_ms,
        })
    }

    pub fn review_get_by_sprint(&self, sprint_id: &str) -> Result<Option<ReviewRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, sprint_id, summary, created_at_ms FROM reviews WHERE sprint_id = ?1",
                params![sprint_id],
                |row| {
                    Ok(ReviewRow {
                        id: row.get(0)?,
                        sprint_id: row.get(1)?,
                        summary: row.get(2)?,
                        created_at_ms: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn retrospective_create(
        &mut self,
        request: RetrospectiveCreateRequest,
    ) -> Result<RetrospectiveRow, StoreError> {
        let RetrospectiveCreateRequest { sprint_id, summary } = request;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        sprint_milestone_tx(&tx, &sprint_id)?;

        let seq = next_counter_tx(&tx, "retrospective")?;
        let id = format!("RETRO-{:03}", seq);

        let insert = tx.execute(
            r#"
            INSERT INTO retrospectives(id, sprint_id, summary, created_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![id, sprint_id, summary, now_ms],
        );
        if let Err(err) = insert {
            if is_constraint_violation(&err) {
                return Err(StoreError::InvalidInput(
                    "sprint already has a retrospective",
                ));
            }
            return Err(StoreError::Sql(err));
        }

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "retrospective.created",
            &json!({ "retrospective_id": id, "sprint_id": sprint_id }),
        )?;

        tx.commit()?;
        Ok(RetrospectiveRow {
            id,
            sprint_id,
            summary,
            created_at_ms: now_ms,
        })
    }

    pub fn retrospective_get_by_sprint(
        &self,
        sprint_id: &str,
    ) -> Result<Option<RetrospectiveRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, sprint_id, summary, created_at_ms
                FROM retrospectives
                WHERE sprint_id = ?1
                "#,
                params![sprint_id],
                |row| {
                    Ok(RetrospectiveRow {
                        id: row.get(0)?,
                        sprint_id: row.get(1)?,
                        summary: row.get(2)?,
                        created_at_ms: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn daily_entry_create(
        &mut self,
        request: DailyEntryCreateRequest,
    ) -> Result<DailyEntryRow, StoreError> {
        let DailyEntryCreateRequest {
            sprint_id,
            task_id,
            note,
        } = request;

        if sprint_id.is_none() && task_id.is_none() {
            return Err(StoreError::InvalidInput(
                "daily entry needs a sprint or a task",
            ));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        if let Some(sprint_id) = sprint_id.as_deref() {
            sprint_milestone_tx(&tx, sprint_id)?;
        }
        if let Some(task_id) = task_id.as_deref() {
            task_core_tx(&tx, task_id)?;
        }

        let seq = next_counter_tx(&tx, "daily_entry")?;
        let id = format!("DAY-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO daily_entries(id, sprint_id, task_id, note, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, sprint_id, task_id, note, now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "daily_entry.created",
            &json!({ "daily_entry_id": id, "sprint_id": sprint_id, "task_id": task_id }),
        )?;

        tx.commit()?;
        Ok(DailyEntryRow {
            id,
            sprint_id,
            task_id,
            note,
            created_at_ms: now_ms,
        })
    }

    pub fn daily_entry_list_by_sprint(
        &self,
        sprint_id: &str,
    ) -> Result<Vec<DailyEntryRow>, StoreError> {
        self.daily_entry_list(
            "SELECT id, sprint_id, task_id, note, created_at_ms \
             FROM daily_entries WHERE sprint_id = ?1 ORDER BY id ASC",
            sprint_id,
        )
    }

    pub fn daily_entry_list_by_task(
        &self,
        task_id: &str,
    ) -> Result<Vec<DailyEntryRow>, StoreError> {
        self.daily_entry_list(
            "SELECT id, sprint_id, task_id, note, created_at_ms \
             FROM daily_entries WHERE task_id = ?1 ORDER BY id ASC",
            task_id,
        )
    }

    fn daily_entry_list(&self, sql: &str, id: &str) -> Result<Vec<DailyEntryRow>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(DailyEntryRow {
                id: row.get(0)?,
                sprint_id: row.get(1)?,
                task_id: row.get(2)?,
                note: row.get(3)?,
                created_at_ms: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
