use rusqlite::Connection;

/// Initialize the database schema, creating tables if they don't exist.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS alerts (
            id             TEXT    PRIMARY KEY,
            campaign_id    TEXT    NOT NULL,
            recipient_id   TEXT    NOT NULL,
            alert_type     TEXT    NOT NULL,
            priority       TEXT    NOT NULL,
            priority_rank  INTEGER NOT NULL,
            status         TEXT    NOT NULL,
            title          TEXT    NOT NULL,
            message        TEXT    NOT NULL,
            threshold      REAL    NOT NULL,
            current_value  REAL    NOT NULL,
            previous_value REAL,
            detail         TEXT    NOT NULL,
            is_read        INTEGER NOT NULL DEFAULT 0,
            read_at        TEXT,
            email_sent     INTEGER NOT NULL DEFAULT 0,
            chat_sent      INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT    NOT NULL,
            updated_at     TEXT    NOT NULL,
            resolved_at    TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_dedup
            ON alerts(campaign_id, alert_type, status, created_at);
        CREATE INDEX IF NOT EXISTS idx_alerts_recipient
            ON alerts(recipient_id, is_read, created_at);
        CREATE INDEX IF NOT EXISTS idx_alerts_resolved_at ON alerts(resolved_at);",
    )?;
    Ok(())
}
