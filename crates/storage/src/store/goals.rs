#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use serde_json::json;

impl SqliteStore {
    pub fn goal_create(
        &mut self,
        request: SponsoredGoalCreateRequest,
    ) -> Result<SponsoredGoalRow, StoreError> {
        let SponsoredGoalCreateRequest {
            sponsor_id,
            project_id,
            title,
            max_users,
            verification,
            starts_at_ms,
            ends_at_ms,
        } = request;

        let sponsor_id = canonicalize_user(&sponsor_id)?;
        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty"));
        }
        if max_users == 0 {
            return Err(StoreError::InvalidInput("max_users must be positive"));
        }
        if ends_at_ms <= starts_at_ms {
            return Err(StoreError::InvalidInput("availability window is inverted"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let template = project_core_tx(&tx, &project_id)?;
        if template.user_id != sponsor_id {
            return Err(StoreError::Forbidden(
                "template project is owned by another user",
            ));
        }
        if template.sponsored_goal_id.is_some() {
            return Err(StoreError::InvalidInput(
                "an enrolled copy cannot be used as a template",
            ));
        }

        let seq = next_counter_tx(&tx, "goal")?;
        let id = format!("GOAL-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO sponsored_goals(id, sponsor_id, project_id, title, max_users,
                                        verification, starts_at_ms, ends_at_ms, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                id,
                sponsor_id,
                project_id,
                title,
                i64::from(max_users),
                verification.as_str(),
                starts_at_ms,
                ends_at_ms,
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "goal.created",
            &json!({
                "goal_id": id,
                "sponsor_id": sponsor_id,
                "project_id": project_id,
                "max_users": max_users,
            }),
        )?;

        tx.commit()?;
        Ok(SponsoredGoalRow {
            id,
            sponsor_id,
            project_id,
            title,
            max_users,
            verification,
            starts_at_ms,
            ends_at_ms,
            created_at_ms: now_ms,
        })
    }

    pub fn goal_get(&self, id: &str) -> Result<Option<SponsoredGoalRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, sponsor_id, project_id, title, max_users, verification,
                       starts_at_ms, ends_at_ms, created_at_ms
                FROM sponsored_goals
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                        row.get::<_, i64>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            id,
            sponsor_id,
            project_id,
            title,
            max_users,
            verification,
            starts_at_ms,
            ends_at_ms,
            created_at_ms,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(SponsoredGoalRow {
            id,
            sponsor_id,
            project_id,
            title,
            max_users: u32::try_from(max_users)
                .map_err(|_| StoreError::InvalidInput("invalid max_users value"))?,
            verification: parse_verification(&verification)?,
            starts_at_ms,
            ends_at_ms,
            created_at_ms,
        }))
    }

    pub fn goal_edit(
        &mut self,
        request: SponsoredGoalEditRequest,
    ) -> Result<SponsoredGoalRow, StoreError> {
        let SponsoredGoalEditRequest {
            id,
            title,
            max_users,
            starts_at_ms,
            ends_at_ms,
        } = request;

        if title.is_none() && max_users.is_none() && starts_at_ms.is_none() && ends_at_ms.is_none()
        {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        if max_users == Some(0) {
            return Err(StoreError::InvalidInput("max_users must be positive"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let row = tx
            .query_row(
                "SELECT title, max_users, starts_at_ms, ends_at_ms FROM sponsored_goals WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((current_title, current_max_users, current_starts, current_ends)) = row else {
            return Err(StoreError::UnknownGoal);
        };

        let new_title = title.unwrap_or(current_title);
        let new_max_users = max_users.map(i64::from).unwrap_or(current_max_users);
        let new_starts = starts_at_ms.unwrap_or(current_starts);
        let new_ends = ends_at_ms.unwrap_or(current_ends);
        if new_ends <= new_starts {
            return Err(StoreError::InvalidInput("availability window is inverted"));
        }

        tx.execute(
            r#"
            UPDATE sponsored_goals
            SET title = ?2, max_users = ?3, starts_at_ms = ?4, ends_at_ms = ?5
            WHERE id = ?1
            "#,
            params![id, new_title, new_max_users, new_starts, new_ends],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "goal.edited",
            &json!({ "goal_id": id, "max_users": new_max_users }),
        )?;

        tx.commit()?;
        self.goal_get(&id)?.ok_or(StoreError::UnknownGoal)
    }

    pub fn enrollment_count_active(&self, goal_id: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM enrollments WHERE goal_id = ?1 AND status = 'active'",
            params![goal_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
