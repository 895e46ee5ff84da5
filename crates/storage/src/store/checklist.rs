#![forbid(unsafe_code)]

use super::*;
use gp_core::model::ChecklistOwner;
use rusqlite::{OptionalExtension, Row, Transaction, params};
use serde_json::json;

const ITEM_COLUMNS: &str = "id, task_id, goal_id, description, required, checked, created_at_ms";

type RawItem = (
    String,
    Option<String>,
    Option<String>,
    String,
    i64,
    i64,
    i64,
);

fn read_item(row: &Row<'_>) -> rusqlite::Result<RawItem> {
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

fn build_item(raw: RawItem) -> Result<ChecklistItemRow, StoreError> {
    let (id, task_id, goal_id, description, required, checked, created_at_ms) = raw;
    let owner = owner_from_columns(&id, task_id, goal_id)?;
    Ok(ChecklistItemRow {
        id,
        owner,
        description,
        required: required != 0,
        checked: checked != 0,
        created_at_ms,
    })
}

/// The schema CHECK keeps exactly one owner column set; a row that
/// violates it anyway is surfaced as an invariant violation, not mapped
/// to an arbitrary owner.
fn owner_from_columns(
    item_id: &str,
    task_id: Option<String>,
    goal_id: Option<String>,
) -> Result<ChecklistOwner, StoreError> {
    match (task_id, goal_id) {
        (Some(task_id), None) => Ok(ChecklistOwner::Task(task_id)),
        (None, Some(goal_id)) => Ok(ChecklistOwner::Template(goal_id)),
        _ => Err(StoreError::OrphanedChecklistItem {
            item_id: item_id.to_string(),
        }),
    }
}

fn ensure_owner_may_mutate_tx(
    tx: &Transaction<'_>,
    actor: &str,
    owner: &ChecklistOwner,
) -> Result<(), StoreError> {
    match owner {
        ChecklistOwner::Task(task_id) => {
            let project_owner = task_project_owner_tx(tx, task_id)?;
            if project_owner != actor {
                return Err(StoreError::Forbidden(
                    "task checklist items belong to the project owner",
                ));
            }
        }
        ChecklistOwner::Template(goal_id) => {
            let goal = goal_core_tx(tx, goal_id)?;
            if goal.sponsor_id != actor {
                return Err(StoreError::Forbidden(
                    "template checklist items belong to the sponsor",
                ));
            }
        }
    }
    Ok(())
}

impl SqliteStore {
    pub fn checklist_item_create(
        &mut self,
        request: ChecklistItemCreateRequest,
    ) -> Result<ChecklistItemRow, StoreError> {
        let ChecklistItemCreateRequest {
            actor,
            owner,
            description,
            required,
        } = request;

        let actor = canonicalize_user(&actor)?;
        if description.trim().is_empty() {
            return Err(StoreError::InvalidInput("description must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_owner_may_mutate_tx(&tx, &actor, &owner)?;

        let seq = next_counter_tx(&tx, "item")?;
        let id = format!("ITEM-{:03}", seq);

        tx.execute(
            r#"
            INSERT INTO checklist_items(id, task_id, goal_id, description, required, checked,
                                        created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
            params![
                id,
                owner.task_id(),
                owner.goal_id(),
                description,
                required as i64,
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "checklist.created",
            &json!({
                "item_id": id,
                "task_id": owner.task_id(),
                "goal_id": owner.goal_id(),
                "required": required,
            }),
        )?;

        tx.commit()?;
        Ok(ChecklistItemRow {
            id,
            owner,
            description,
            required,
            checked: false,
            created_at_ms: now_ms,
        })
    }

    pub fn checklist_item_get(&self, id: &str) -> Result<Option<ChecklistItemRow>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM checklist_items WHERE id = ?1"),
                params![id],
                read_item,
            )
            .optional()?;

        raw.map(build_item).transpose()
    }

    pub fn checklist_list_by_task(
        &self,
        task_id: &str,
    ) -> Result<Vec<ChecklistItemRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM checklist_items WHERE task_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![task_id], read_item)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_item(row?)?);
        }
        Ok(out)
    }

    pub fn checklist_list_by_goal(
        &self,
        goal_id: &str,
    ) -> Result<Vec<ChecklistItemRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM checklist_items WHERE goal_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![goal_id], read_item)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_item(row?)?);
        }
        Ok(out)
    }

    /// Mutate a checklist item. The caller is responsible for running
    /// the status cascade afterwards when the item is task-owned.
    pub fn checklist_item_update(
        &mut self,
        request: ChecklistItemUpdateRequest,
    ) -> Result<ChecklistItemRow, StoreError> {
        let ChecklistItemUpdateRequest {
            actor,
            id,
            description,
            required,
            checked,
        } = request;

        let actor = canonicalize_user(&actor)?;
        if description.is_none() && required.is_none() && checked.is_none() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let raw = tx
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM checklist_items WHERE id = ?1"),
                params![id],
                read_item,
            )
            .optional()?;

        let Some(raw) = raw else {
            return Err(StoreError::UnknownChecklistItem);
        };
        let current = build_item(raw)?;
        ensure_owner_may_mutate_tx(&tx, &actor, &current.owner)?;

        let new_description = description.unwrap_or(current.description);
        let new_required = required.unwrap_or(current.required);
        let new_checked = checked.unwrap_or(current.checked);

        tx.execute(
            r#"
            UPDATE checklist_items
            SET description = ?2, required = ?3, checked = ?4
            WHERE id = ?1
            "#,
            params![id, new_description, new_required as i64, new_checked as i64],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "checklist.updated",
            &json!({
                "item_id": id,
                "required": new_required,
                "checked": new_checked,
            }),
        )?;

        tx.commit()?;
        Ok(ChecklistItemRow {
            id,
            owner: current.owner,
            description: new_description,
            required: new_required,
            checked: new_checked,
            created_at_ms: current.created_at_ms,
        })
    }

    /// Delete a checklist item, returning its owner so the caller can
    /// recompute the owning task's chain.
    pub fn checklist_item_delete(
        &mut self,
        actor: &str,
        id: &str,
    ) -> Result<ChecklistOwner, StoreError> {
        let actor = canonicalize_user(actor)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let raw = tx
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM checklist_items WHERE id = ?1"),
                params![id],
                read_item,
            )
            .optional()?;

        let Some(raw) = raw else {
            return Err(StoreError::UnknownChecklistItem);
        };
        let current = build_item(raw)?;
        ensure_owner_may_mutate_tx(&tx, &actor, &current.owner)?;

        tx.execute("DELETE FROM checklist_items WHERE id = ?1", params![id])?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(id),
            "checklist.deleted",
            &json!({
                "item_id": id,
                "task_id": current.owner.task_id(),
                "goal_id": current.owner.goal_id(),
            }),
        )?;

        tx.commit()?;
        Ok(current.owner)
    }
}
