#![forbid(unsafe_code)]

use super::*;
use gp_core::model::RewardStatus;
use rusqlite::{OptionalExtension, params};
use serde_json::json;

impl SqliteStore {
    pub fn reward_create(&mut self, request: RewardCreateRequest) -> Result<RewardRow, StoreError> {
        let RewardCreateRequest { title, points } = request;

        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty"));
        }
        if points < 0 {
            return Err(StoreError::InvalidInput("points must not be negative"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let seq = next_counter_tx(&tx, "reward")?;
        let id = format!("RWD-{:03}", seq);

        tx.execute(
            "INSERT INTO rewards(id, title, points, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, points, now_ms],
        )?;

        insert_event_tx(
            &tx,
            now_ms,
            Some(&id),
            "reward.created",
            &json!({ "reward_id": id }),
        )?;

        tx.commit()?;
        Ok(RewardRow {
            id,
            title,
            points,
            created_at_ms: now_ms,
        })
    }

    pub fn reward_get(&self, id: &str) -> Result<Option<RewardRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, title, points, created_at_ms FROM rewards WHERE id = ?1",
                params![id],
                |row| {
                    Ok(RewardRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        points: row.get(2)?,
                        created_at_ms: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn user_reward_get(
        &self,
        user_id: &str,
        reward_id: &str,
    ) -> Result<Option<UserRewardRow>, StoreError> {
        let user_id = canonicalize_user(user_id)?;
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, reward_id, status, claimed_at_ms, delivered_at_ms,
                       created_at_ms
                FROM user_rewards
                WHERE user_id = ?1 AND reward_id = ?2
                "#,
                params![user_id, reward_id],
                read_user_reward,
            )
            .optional()?;

        row.map(build_user_reward).transpose()
    }

    pub fn user_reward_list_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserRewardRow>, StoreError> {
        let user_id = canonicalize_user(user_id)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, reward_id, status, claimed_at_ms, delivered_at_ms, created_at_ms
            FROM user_rewards
            WHERE user_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], read_user_reward)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_user_reward(row?)?);
        }
        Ok(out)
    }

    /// Settle a reward claim for `(user, reward)`. Creates the row the
    /// first time, upgrades a pending row, and leaves a claimed or
    /// delivered row untouched: a reward never regresses.
    pub fn reward_settle(
        &mut self,
        user_id: &str,
        reward_id: &str,
    ) -> Result<Settlement, StoreError> {
        let user_id = canonicalize_user(user_id)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_reward_exists_tx(&tx, reward_id)?;

        let existing = tx
            .query_row(
                "SELECT id, status FROM user_rewards WHERE user_id = ?1 AND reward_id = ?2",
                params![user_id, reward_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let settlement = match existing {
            None => {
                let seq = next_counter_tx(&tx, "user_reward")?;
                let id = format!("UR-{:03}", seq);

                let insert = tx.execute(
                    r#"
                    INSERT INTO user_rewards(id, user_id, reward_id, status, claimed_at_ms,
                                             delivered_at_ms, created_at_ms)
                    VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?5)
                    "#,
                    params![
                        id,
                        user_id,
                        reward_id,
                        RewardStatus::Claimed.as_str(),
                        now_ms
                    ],
                );
                if let Err(err) = insert {
                    if is_constraint_violation(&err) {
                        // Lost a race against another settlement of the
                        // same pair; the existing row is authoritative.
                        return Err(StoreError::InvalidInput(
                            "user reward already exists for this pair",
                        ));
                    }
                    return Err(StoreError::Sql(err));
                }

                insert_event_tx(
                    &tx,
                    now_ms,
                    Some(&id),
                    "reward.settled",
                    &json!({
                        "user_reward_id": id,
                        "user_id": user_id,
                        "reward_id": reward_id,
                        "status": RewardStatus::Claimed.as_str(),
                    }),
                )?;

                Settlement {
                    user_reward_id: id,
                    user_id,
                    reward_id: reward_id.to_string(),
                    previous: None,
                    status: RewardStatus::Claimed,
                    newly_claimed: true,
                }
            }
            Some((id, status)) => {
                let previous = RewardStatus::parse(&status)
                    .ok_or(StoreError::InvalidInput("invalid reward status value"))?;
                match previous {
                    RewardStatus::Pending => {
                        tx.execute(
                            r#"
                            UPDATE user_rewards
                            SET status = ?2, claimed_at_ms = ?3
                            WHERE id = ?1
                            "#,
                            params![id, RewardStatus::Claimed.as_str(), now_ms],
                        )?;

                        insert_event_tx(
                            &tx,
                            now_ms,
                            Some(&id),
                            "reward.settled",
                            &json!({
                                "user_reward_id": id,
                                "user_id": user_id,
                                "reward_id": reward_id,
                                "status": RewardStatus::Claimed.as_str(),
                            }),
                        )?;

                        Settlement {
                            user_reward_id: id,
                            user_id,
                            reward_id: reward_id.to_string(),
                            previous: Some(previous),
                            status: RewardStatus::Claimed,
                            newly_claimed: true,
                        }
                    }
                    RewardStatus::Claimed | RewardStatus::Delivered => Settlement {
                        user_reward_id: id,
                        user_id,
                        reward_id: reward_id.to_string(),
                        previous: Some(previous),
                        status: previous,
                        newly_claimed: false,
                    },
                }
            }
        };

        tx.commit()?;
        Ok(settlement)
    }

    /// Mark a claimed reward as delivered.
    pub fn reward_deliver(
        &mut self,
        user_id: &str,
        reward_id: &str,
    ) -> Result<UserRewardRow, StoreError> {
        let user_id = canonicalize_user(user_id)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT id, status FROM user_rewards WHERE user_id = ?1 AND reward_id = ?2",
                params![user_id, reward_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((id, status)) = existing else {
            return Err(StoreError::UnknownUserReward);
        };
        let status = RewardStatus::parse(&status)
            .ok_or(StoreError::InvalidInput("invalid reward status value"))?;

        match status {
            RewardStatus::Pending => {
                return Err(StoreError::InvalidInput("reward has not been claimed"));
            }
            RewardStatus::Delivered => {}
            RewardStatus::Claimed => {
                tx.execute(
                    "UPDATE user_rewards SET status = ?2, delivered_at_ms = ?3 WHERE id = ?1",
                    params![id, RewardStatus::Delivered.as_str(), now_ms],
                )?;

                insert_event_tx(
                    &tx,
                    now_ms,
                    Some(&id),
                    "reward.delivered",
                    &json!({
                        "user_reward_id": id,
                        "user_id": user_id,
                        "reward_id": reward_id,
                    }),
                )?;
            }
        }

        tx.commit()?;
        self.user_reward_get(&user_id, reward_id)?
            .ok_or(StoreError::UnknownUserReward)
    }
}

type RawUserReward = (String, String, String, String, Option<i64>, Option<i64>, i64);

fn read_user_reward(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUserReward> {
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

fn build_user_reward(raw: RawUserReward) -> Result<UserRewardRow, StoreError> {
    let (id, user_id, reward_id, status, claimed_at_ms, delivered_at_ms, created_at_ms) = raw;
    Ok(UserRewardRow {
        id,
        user_id,
        reward_id,
        status: RewardStatus::parse(&status)
            .ok_or(StoreError::InvalidInput("invalid reward status value"))?,
        claimed_at_ms,
        delivered_at_ms,
        created_at_ms,
    })
}
