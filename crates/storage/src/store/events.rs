#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;

impl SqliteStore {
    /// Read the journal forward from (and excluding) `since_seq`.
    pub fn events_list(
        &self,
        since_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<EventRow>, StoreError> {
        let since_seq = since_seq.unwrap_or(0);
        let limit = i64::try_from(limit)
            .map_err(|_| StoreError::InvalidInput("numeric overflow"))?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, ts_ms, entity_id, type, payload_json
            FROM events
            WHERE seq > ?1
            ORDER BY seq ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![since_seq, limit], |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                entity_id: row.get(2)?,
                event_type: row.get(3)?,
                payload_json: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn events_last_seq(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(MAX(seq), 0) FROM events", [], |row| {
                row.get(0)
            })?)
    }
}
