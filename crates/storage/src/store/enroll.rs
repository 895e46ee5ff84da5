#![forbid(unsafe_code)]

use super::*;
use gp_core::duplicate::{
    ProjectCopy, TemplateChecklistItem, TemplateMilestone, TemplateProject, TemplateTask,
    duplicate_project,
};
use gp_core::ids::UserId;
use gp_core::model::EnrollmentStatus;
use rusqlite::{OptionalExtension, Transaction, params};
use serde_json::json;

impl SqliteStore {
    /// Enroll a user into a sponsored goal and duplicate its template
    /// hierarchy. One transaction end to end: a failed copy leaves no
    /// visible enrollment or half-built project.
    pub fn enroll(&mut self, request: EnrollRequest) -> Result<EnrollmentOutcome, StoreError> {
        let EnrollRequest { user_id, goal_id } = request;

        let user = UserId::try_new(user_id.as_str())
            .map_err(|_| StoreError::InvalidInput("invalid user id"))?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let goal = goal_core_tx(&tx, &goal_id)?;
        if now_ms < goal.starts_at_ms || now_ms > goal.ends_at_ms {
            return Err(StoreError::GoalNotAvailable);
        }

        let already_enrolled = tx
            .query_row(
                "SELECT 1 FROM enrollments WHERE user_id = ?1 AND goal_id = ?2",
                params![user.as_str(), goal_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if already_enrolled {
            return Err(StoreError::DuplicateEnrollment);
        }

        let active: i64 = tx.query_row(
            "SELECT COUNT(*) FROM enrollments WHERE goal_id = ?1 AND status = 'active'",
            params![goal_id],
            |row| row.get(0),
        )?;
        if active >= i64::from(goal.max_users) {
            return Err(StoreError::CapacityExceeded {
                max_users: goal.max_users,
            });
        }

        let enrollment_seq = next_counter_tx(&tx, "enrollment")?;
        let enrollment_id = format!("ENR-{:03}", enrollment_seq);

        let insert = tx.execute(
            r#"
            INSERT INTO enrollments(id, user_id, goal_id, status, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                enrollment_id,
                user.as_str(),
                goal_id,
                EnrollmentStatus::Active.as_str(),
                now_ms
            ],
        );
        if let Err(err) = insert {
            if is_constraint_violation(&err) {
                return Err(StoreError::DuplicateEnrollment);
            }
            return Err(StoreError::Sql(err));
        }

        let template = load_template_tx(&tx, &goal.project_id)?;
        let copy = duplicate_project(&template, &user, &goal_id, &enrollment_id);
        let project_id = insert_copy_tx(&tx, &copy, now_ms)?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&enrollment_id),
            "enrollment.created",
            &json!({
                "enrollment_id": enrollment_id,
                "goal_id": goal_id,
                "user_id": user.as_str(),
                "project_id": project_id,
            }),
        )?;

        tx.commit()?;
        Ok(EnrollmentOutcome {
            enrollment: EnrollmentRow {
                id: enrollment_id,
                user_id: user.as_str().to_string(),
                goal_id,
                status: EnrollmentStatus::Active,
                created_at_ms: now_ms,
                updated_at_ms: now_ms,
            },
            project_id,
        })
    }

    pub fn enrollment_get(&self, id: &str) -> Result<Option<EnrollmentRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, goal_id, status, created_at_ms, updated_at_ms
                FROM enrollments
                WHERE id = ?1
                "#,
                params![id],
                read_enrollment,
            )
            .optional()?;

        row.map(build_enrollment).transpose()
    }

    pub fn enrollment_find(
        &self,
        user_id: &str,
        goal_id: &str,
    ) -> Result<Option<EnrollmentRow>, StoreError> {
        let user_id = canonicalize_user(user_id)?;
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, goal_id, status, created_at_ms, updated_at_ms
                FROM enrollments
                WHERE user_id = ?1 AND goal_id = ?2
                "#,
                params![user_id, goal_id],
                read_enrollment,
            )
            .optional()?;

        row.map(build_enrollment).transpose()
    }

    pub fn enrollment_list_by_goal(&self, goal_id: &str) -> Result<Vec<EnrollmentRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, goal_id, status, created_at_ms, updated_at_ms
            FROM enrollments
            WHERE goal_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![goal_id], read_enrollment)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_enrollment(row?)?);
        }
        Ok(out)
    }

    /// Change an enrollment's status. The linked project's `is_active`
    /// flag mirrors whether the enrollment is active.
    pub fn enrollment_set_status(
        &mut self,
        request: EnrollmentSetStatusRequest,
    ) -> Result<EnrollmentRow, StoreError> {
        let EnrollmentSetStatusRequest { id, status } = request;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let row = tx
            .query_row(
                r#"
                SELECT id, user_id, goal_id, status, created_at_ms, updated_at_ms
                FROM enrollments
                WHERE id = ?1
                "#,
                params![id],
                read_enrollment,
            )
            .optional()?;

        let Some(raw) = row else {
            return Err(StoreError::UnknownEnrollment);
        };
        let current = build_enrollment(raw)?;
        if current.status == status {
            return Ok(current);
        }

        tx.execute(
            "UPDATE enrollments SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_ms],
        )?;
        tx.execute(
            "UPDATE projects SET is_active = ?2, updated_at_ms = ?3 WHERE enrollment_id = ?1",
            params![
                id,
                (status == EnrollmentStatus::Active) as i64,
                now_ms
            ],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "enrollment.status",
            &json!({
                "enrollment_id": id,
                "from": current.status.as_str(),
                "to": status.as_str(),
            }),
        )?;

        tx.commit()?;
        Ok(EnrollmentRow {
            status,
            updated_at_ms: now_ms,
            ..current
        })
    }
}

type RawEnrollment = (String, String, String, String, i64, i64);

fn read_enrollment(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEnrollment> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_enrollment(raw: RawEnrollment) -> Result<EnrollmentRow, StoreError> {
    let (id, user_id, goal_id, status, created_at_ms, updated_at_ms) = raw;
    Ok(EnrollmentRow {
        id,
        user_id,
        goal_id,
        status: EnrollmentStatus::parse(&status)
            .ok_or(StoreError::InvalidInput("invalid enrollment status value"))?,
        created_at_ms,
        updated_at_ms,
    })
}

/// Snapshot a template project's full hierarchy for duplication.
fn load_template_tx(
    tx: &Transaction<'_>,
    project_id: &str,
) -> Result<TemplateProject, StoreError> {
    let project = tx
        .query_row(
            "SELECT title, description, reward_id, status FROM projects WHERE id = ?1",
            params![project_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((title, description, reward_id, status)) = project else {
        return Err(StoreError::UnknownProject);
    };

    let mut milestones = Vec::new();
    let mut milestone_stmt = tx.prepare(
        "SELECT id, title, reward_id, status FROM milestones WHERE project_id = ?1 ORDER BY id ASC",
    )?;
    let milestone_rows = milestone_stmt
        .query_map(params![project_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut task_stmt = tx.prepare(
        r#"
        SELECT id, title, status, sprint_id, starts_at_ms, ends_at_ms, points
        FROM tasks
        WHERE milestone_id = ?1
        ORDER BY id ASC
        "#,
    )?;
    let mut item_stmt = tx.prepare(
        r#"
        SELECT description, required, checked
        FROM checklist_items
        WHERE task_id = ?1
        ORDER BY id ASC
        "#,
    )?;

    for (milestone_id, milestone_title, milestone_reward_id, milestone_status) in milestone_rows {
        let task_rows = task_stmt
            .query_map(params![milestone_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tasks = Vec::new();
        for (task_id, task_title, task_status, sprint_id, starts_at_ms, ends_at_ms, points) in
            task_rows
        {
            let items = item_stmt
                .query_map(params![task_id], |row| {
                    Ok(TemplateChecklistItem {
                        description: row.get(0)?,
                        required: row.get::<_, i64>(1)? != 0,
                        checked: row.get::<_, i64>(2)? != 0,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            tasks.push(TemplateTask {
                title: task_title,
                status: parse_status(&task_status)?,
                sprint_id,
                starts_at_ms,
                ends_at_ms,
                points,
                items,
            });
        }

        milestones.push(TemplateMilestone {
            title: milestone_title,
            reward_id: milestone_reward_id,
            status: parse_status(&milestone_status)?,
            tasks,
        });
    }

    Ok(TemplateProject {
        title,
        description,
        reward_id,
        status: parse_status(&status)?,
        milestones,
    })
}

/// Insert a planned copy, assigning fresh ids throughout. Returns the
/// new project id.
fn insert_copy_tx(
    tx: &Transaction<'_>,
    copy: &ProjectCopy,
    now_ms: i64,
) -> Result<String, StoreError> {
    let project_seq = next_counter_tx(tx, "project")?;
    let project_id = format!("PROJ-{:03}", project_seq);

    tx.execute(
        r#"
        INSERT INTO projects(id, user_id, title, description, reward_id,
                             sponsored_goal_id, enrollment_id, is_active, status,
                             created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
        params![
            project_id,
            copy.user_id,
            copy.title,
            copy.description,
            copy.reward_id,
            copy.sponsored_goal_id,
            copy.enrollment_id,
            copy.is_active as i64,
            copy.status.as_str(),
            now_ms
        ],
    )?;

    for milestone in &copy.milestones {
        let milestone_seq = next_counter_tx(tx, "milestone")?;
        let milestone_id = format!("MS-{:03}", milestone_seq);

        tx.execute(
            r#"
            INSERT INTO milestones(id, project_id, title, reward_id, status,
                                   created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                milestone_id,
                project_id,
                milestone.title,
                milestone.reward_id,
                milestone.status.as_str(),
                now_ms
            ],
        )?;

        for task in &milestone.tasks {
            let task_seq = next_counter_tx(tx, "task")?;
            let task_id = format!("TASK-{:03}", task_seq);

            tx.execute(
                r#"
                INSERT INTO tasks(id, milestone_id, sprint_id, title, status,
                                  starts_at_ms, ends_at_ms, points, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                "#,
                params![
                    task_id,
                    milestone_id,
                    task.sprint_id,
                    task.title,
                    task.status.as_str(),
                    task.starts_at_ms,
                    task.ends_at_ms,
                    task.points,
                    now_ms
                ],
            )?;

            for item in &task.items {
                let item_seq = next_counter_tx(tx, "item")?;
                let item_id = format!("ITEM-{:03}", item_seq);

                tx.execute(
                    r#"
                    INSERT INTO checklist_items(id, task_id, goal_id, description, required,
                                                checked, created_at_ms)
                    VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        item_id,
                        task_id,
                        item.description,
                        item.required as i64,
                        item.checked as i64,
                        now_ms
                    ],
                )?;
            }
        }
    }

    Ok(project_id)
}
