#![forbid(unsafe_code)]

mod checklist;
mod deletes;
mod enroll;
mod entries;
mod error;
mod events;
mod goals;
mod milestones;
mod projects;
mod requests;
mod rewards;
mod sprints;
mod status;
mod tasks;
mod types;

pub use error::StoreError;
pub use requests::*;
pub use types::*;

use gp_core::ids::UserId;
use gp_core::model::{Status, Verification};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join("goalpath.db");
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS counters (
          name TEXT PRIMARY KEY,
          value INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rewards (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          points INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
          id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL,
          title TEXT NOT NULL,
          description TEXT,
          reward_id TEXT NOT NULL REFERENCES rewards(id) ON DELETE RESTRICT,
          sponsored_goal_id TEXT REFERENCES sponsored_goals(id) ON DELETE RESTRICT,
          enrollment_id TEXT REFERENCES enrollments(id) ON DELETE RESTRICT,
          is_active INTEGER NOT NULL,
          status TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          CHECK((sponsored_goal_id IS NULL) = (enrollment_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id, id);

        CREATE TABLE IF NOT EXISTS milestones (
          id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE RESTRICT,
          title TEXT NOT NULL,
          reward_id TEXT REFERENCES rewards(id) ON DELETE RESTRICT,
          status TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_milestones_project ON milestones(project_id, id);

        CREATE TABLE IF NOT EXISTS sprints (
          id TEXT PRIMARY KEY,
          milestone_id TEXT NOT NULL REFERENCES milestones(id) ON DELETE RESTRICT,
          title TEXT NOT NULL,
          starts_at_ms INTEGER,
          ends_at_ms INTEGER,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sprints_milestone ON sprints(milestone_id, id);

        CREATE TABLE IF NOT EXISTS tasks (
          id TEXT PRIMARY KEY,
          milestone_id TEXT NOT NULL REFERENCES milestones(id) ON DELETE RESTRICT,
          sprint_id TEXT REFERENCES sprints(id) ON DELETE RESTRICT,
          title TEXT NOT NULL,
          status TEXT NOT NULL,
          starts_at_ms INTEGER,
          ends_at_ms INTEGER,
          points INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_milestone ON tasks(milestone_id, id);
        CREATE INDEX IF NOT EXISTS idx_tasks_sprint ON tasks(sprint_id, id);

        CREATE TABLE IF NOT EXISTS checklist_items (
          id TEXT PRIMARY KEY,
          task_id TEXT REFERENCES tasks(id) ON DELETE RESTRICT,
          goal_id TEXT REFERENCES sponsored_goals(id) ON DELETE RESTRICT,
          description TEXT NOT NULL,
          required INTEGER NOT NULL,
          checked INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          CHECK((task_id IS NULL) <> (goal_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_checklist_items_task ON checklist_items(task_id, id);
        CREATE INDEX IF NOT EXISTS idx_checklist_items_goal ON checklist_items(goal_id, id);

        CREATE TABLE IF NOT EXISTS reviews (
          id TEXT PRIMARY KEY,
          sprint_id TEXT NOT NULL UNIQUE REFERENCES sprints(id) ON DELETE RESTRICT,
          summary TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS retrospectives (
          id TEXT PRIMARY KEY,
          sprint_id TEXT NOT NULL UNIQUE REFERENCES sprints(id) ON DELETE RESTRICT,
          summary TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_entries (
          id TEXT PRIMARY KEY,
          sprint_id TEXT REFERENCES sprints(id) ON DELETE RESTRICT,
          task_id TEXT REFERENCES tasks(id) ON DELETE RESTRICT,
          note TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          CHECK(sprint_id IS NOT NULL OR task_id IS NOT NULL)
        );

        CREATE INDEX IF NOT EXISTS idx_daily_entries_sprint ON daily_entries(sprint_id, id);
        CREATE INDEX IF NOT EXISTS idx_daily_entries_task ON daily_entries(task_id, id);

        CREATE TABLE IF NOT EXISTS sponsored_goals (
          id TEXT PRIMARY KEY,
          sponsor_id TEXT NOT NULL,
          project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE RESTRICT,
          title TEXT NOT NULL,
          max_users INTEGER NOT NULL,
          verification TEXT NOT NULL,
          starts_at_ms INTEGER NOT NULL,
          ends_at_ms INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sponsored_goals_sponsor ON sponsored_goals(sponsor_id, id);

        CREATE TABLE IF NOT EXISTS enrollments (
          id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL,
          goal_id TEXT NOT NULL REFERENCES sponsored_goals(id) ON DELETE RESTRICT,
          status TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_enrollments_user_goal
          ON enrollments(user_id, goal_id);
        CREATE INDEX IF NOT EXISTS idx_enrollments_goal_status
          ON enrollments(goal_id, status);

        CREATE TABLE IF NOT EXISTS user_rewards (
          id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL,
          reward_id TEXT NOT NULL REFERENCES rewards(id) ON DELETE RESTRICT,
          status TEXT NOT NULL,
          claimed_at_ms INTEGER,
          delivered_at_ms INTEGER,
          created_at_ms INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_user_rewards_user_reward
          ON user_rewards(user_id, reward_id);

        CREATE TABLE IF NOT EXISTS events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          ts_ms INTEGER NOT NULL,
          entity_id TEXT,
          type TEXT NOT NULL,
          payload_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE name=?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value=excluded.value
        "#,
        params![name, next],
    )?;
    Ok(next)
}

fn insert_event_tx(
    tx: &Transaction<'_>,
    ts_ms: i64,
    entity_id: Option<&str>,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<EventRow, StoreError> {
    let payload_json = payload.to_string();
    tx.execute(
        "INSERT INTO events(ts_ms, entity_id, type, payload_json) VALUES (?1, ?2, ?3, ?4)",
        params![ts_ms, entity_id, event_type, payload_json],
    )?;
    Ok(EventRow {
        seq: tx.last_insert_rowid(),
        ts_ms,
        entity_id: entity_id.map(str::to_string),
        event_type: event_type.to_string(),
        payload_json,
    })
}

fn canonicalize_user(value: &str) -> Result<String, StoreError> {
    UserId::try_new(value)
        .map(|user| user.as_str().to_string())
        .map_err(|_| StoreError::InvalidInput("invalid user id"))
}

fn parse_status(value: &str) -> Result<Status, StoreError> {
    Status::parse(value).ok_or(StoreError::InvalidInput("invalid status value"))
}

fn parse_verification(value: &str) -> Result<Verification, StoreError> {
    Verification::parse(value).ok_or(StoreError::InvalidInput("invalid verification value"))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

/// Minimal projection of a project used by the derivers, ownership
/// checks, and the enrollment engine.
#[derive(Debug)]
struct ProjectCore {
    user_id: String,
    reward_id: String,
    status: Status,
    sponsored_goal_id: Option<String>,
    enrollment_id: Option<String>,
}

fn project_core_tx(tx: &Transaction<'_>, project_id: &str) -> Result<ProjectCore, StoreError> {
    let row = tx
        .query_row(
            r#"
            SELECT user_id, reward_id, status, sponsored_goal_id, enrollment_id
            FROM projects
            WHERE id = ?1
            "#,
            params![project_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((user_id, reward_id, status, sponsored_goal_id, enrollment_id)) = row else {
        return Err(StoreError::UnknownProject);
    };

    Ok(ProjectCore {
        user_id,
        reward_id,
        status: parse_status(&status)?,
        sponsored_goal_id,
        enrollment_id,
    })
}

fn milestone_core_tx(
    tx: &Transaction<'_>,
    milestone_id: &str,
) -> Result<(String, Status), StoreError> {
    let row = tx
        .query_row(
            "SELECT project_id, status FROM milestones WHERE id = ?1",
            params![milestone_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((project_id, status)) = row else {
        return Err(StoreError::UnknownMilestone);
    };
    Ok((project_id, parse_status(&status)?))
}

fn task_core_tx(tx: &Transaction<'_>, task_id: &str) -> Result<(String, Status), StoreError> {
    let row = tx
        .query_row(
            "SELECT milestone_id, status FROM tasks WHERE id = ?1",
            params![task_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((milestone_id, status)) = row else {
        return Err(StoreError::UnknownTask);
    };
    Ok((milestone_id, parse_status(&status)?))
}

fn sprint_milestone_tx(tx: &Transaction<'_>, sprint_id: &str) -> Result<String, StoreError> {
    tx.query_row(
        "SELECT milestone_id FROM sprints WHERE id = ?1",
        params![sprint_id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .ok_or(StoreError::UnknownSprint)
}

#[derive(Debug)]
struct GoalCore {
    sponsor_id: String,
    project_id: String,
    max_users: u32,
    verification: Verification,
    starts_at_ms: i64,
    ends_at_ms: i64,
}

fn goal_core_tx(tx: &Transaction<'_>, goal_id: &str) -> Result<GoalCore, StoreError> {
    let row = tx
        .query_row(
            r#"
            SELECT sponsor_id, project_id, max_users, verification, starts_at_ms, ends_at_ms
            FROM sponsored_goals
            WHERE id = ?1
            "#,
            params![goal_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((sponsor_id, project_id, max_users, verification, starts_at_ms, ends_at_ms)) = row
    else {
        return Err(StoreError::UnknownGoal);
    };

    Ok(GoalCore {
        sponsor_id,
        project_id,
        max_users: u32::try_from(max_users)
            .map_err(|_| StoreError::InvalidInput("invalid max_users value"))?,
        verification: parse_verification(&verification)?,
        starts_at_ms,
        ends_at_ms,
    })
}

fn reward_exists_tx(tx: &Transaction<'_>, reward_id: &str) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM rewards WHERE id = ?1",
            params![reward_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

fn ensure_reward_exists_tx(tx: &Transaction<'_>, reward_id: &str) -> Result<(), StoreError> {
    if reward_exists_tx(tx, reward_id)? {
        Ok(())
    } else {
        Err(StoreError::UnknownReward)
    }
}

/// Walk a task-owned checklist item up to its project owner.
fn task_project_owner_tx(tx: &Transaction<'_>, task_id: &str) -> Result<String, StoreError> {
    let (milestone_id, _) = task_core_tx(tx, task_id)?;
    let (project_id, _) = milestone_core_tx(tx, &milestone_id)?;
    Ok(project_core_tx(tx, &project_id)?.user_id)
}

fn count_tx(tx: &Transaction<'_>, sql: &str, id: &str) -> Result<u64, StoreError> {
    let count: i64 = tx.query_row(sql, params![id], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}
