use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::domain::entities::alert::{Alert, AlertUpdate};
use crate::domain::ports::store::{
    AlertFilter, AlertPage, AlertStore, CreateOutcome, Pagination, StoreError,
};
use crate::domain::value_objects::alert_status::AlertStatus;
use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::priority::Priority;

use super::migrations;

const ALERT_COLUMNS: &str = "id, campaign_id, recipient_id, alert_type, priority, status, \
     title, message, threshold, current_value, previous_value, detail, is_read, read_at, \
     email_sent, chat_sent, created_at, updated_at, resolved_at";

const LISTING_ORDER: &str = "ORDER BY is_read ASC, priority_rank DESC, created_at DESC";

/// SQLite-backed persistent alert store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new `SQLite` store at the given path.
    ///
    /// Expands `~`, creates parent directories, opens connection,
    /// sets WAL mode and pragmas, and initializes schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the database cannot be opened or initialized.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let expanded = shellexpand::tilde(path);
        let db_path = PathBuf::from(expanded.as_ref());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let conn =
            Connection::open(&db_path).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        migrations::initialize_schema(&conn).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Delete resolved and dismissed alerts closed more than `retention_days` ago.
    /// Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if deletion fails.
    pub fn cleanup_resolved(&self, retention_days: u32) -> Result<usize, StoreError> {
        let delta = chrono::TimeDelta::try_days(i64::from(retention_days))
            .ok_or_else(|| StoreError::WriteFailed("invalid retention days".into()))?;
        let cutoff = timestamp(&(Utc::now() - delta));

        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        let removed = conn
            .execute(
                "DELETE FROM alerts WHERE status IN (?1, ?2) AND resolved_at < ?3",
                params![
                    AlertStatus::Resolved.as_str(),
                    AlertStatus::Dismissed.as_str(),
                    cutoff
                ],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(removed)
    }
}

/// Fixed-width RFC 3339 so text comparison orders like time.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

const fn priority_rank(priority: Priority) -> i64 {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
        Priority::Critical => 3,
    }
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_time(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_opt_time(idx: usize, raw: Option<String>) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    raw.map(|s| parse_time(idx, &s)).transpose()
}

fn parse_enum<T: std::str::FromStr<Err = String>>(idx: usize, raw: &str) -> Result<T, rusqlite::Error> {
    raw.parse::<T>().map_err(|e| {
        conversion_error(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

fn parse_alert_row(row: &rusqlite::Row<'_>) -> Result<Alert, rusqlite::Error> {
    let id: String = row.get(0)?;
    let alert_type: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let status: String = row.get(5)?;
    let detail: String = row.get(11)?;
    let created_at: String = row.get(16)?;
    let updated_at: String = row.get(17)?;

    Ok(Alert {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        campaign_id: row.get(1)?,
        recipient_id: row.get(2)?,
        alert_type: parse_enum::<AlertType>(3, &alert_type)?,
        priority: parse_enum::<Priority>(4, &priority)?,
        status: parse_enum::<AlertStatus>(5, &status)?,
        title: row.get(6)?,
        message: row.get(7)?,
        threshold: row.get(8)?,
        current_value: row.get(9)?,
        previous_value: row.get(10)?,
        detail: serde_json::from_str(&detail).map_err(|e| conversion_error(11, e))?,
        is_read: row.get(12)?,
        read_at: parse_opt_time(13, row.get(13)?)?,
        email_sent: row.get(14)?,
        chat_sent: row.get(15)?,
        created_at: parse_time(16, &created_at)?,
        updated_at: parse_time(17, &updated_at)?,
        resolved_at: parse_opt_time(18, row.get(18)?)?,
    })
}

fn fetch(conn: &Connection, id: Uuid) -> Result<Option<Alert>, StoreError> {
    conn.query_row(
        &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
        params![id.to_string()],
        parse_alert_row,
    )
    .optional()
    .map_err(|e| StoreError::ReadFailed(e.to_string()))
}

/// Overwrite every mutable column of an existing row.
fn write_back(conn: &Connection, alert: &Alert) -> Result<(), StoreError> {
    let detail =
        serde_json::to_string(&alert.detail).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    conn.execute(
        "UPDATE alerts SET priority = ?2, priority_rank = ?3, status = ?4, title = ?5, \
         message = ?6, threshold = ?7, current_value = ?8, previous_value = ?9, detail = ?10, \
         is_read = ?11, read_at = ?12, email_sent = ?13, chat_sent = ?14, updated_at = ?15, \
         resolved_at = ?16 WHERE id = ?1",
        params![
            alert.id.to_string(),
            alert.priority.as_str(),
            priority_rank(alert.priority),
            alert.status.as_str(),
            alert.title,
            alert.message,
            alert.threshold,
            alert.current_value,
            alert.previous_value,
            detail,
            alert.is_read,
            alert.read_at.as_ref().map(timestamp),
            alert.email_sent,
            alert.chat_sent,
            timestamp(&alert.updated_at),
            alert.resolved_at.as_ref().map(timestamp),
        ],
    )
    .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    Ok(())
}

fn where_clause(filter: &AlertFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    let mut push = |clause: &str, value: Value| {
        values.push(value);
        clauses.push(format!("{clause} ?{}", values.len()));
    };

    if let Some(recipient) = &filter.recipient_id {
        push("recipient_id =", Value::Text(recipient.clone()));
    }
    if let Some(status) = filter.status {
        push("status =", Value::Text(status.as_str().into()));
    }
    if let Some(priority) = filter.priority {
        push("priority =", Value::Text(priority.as_str().into()));
    }
    if let Some(kind) = filter.alert_type {
        push("alert_type =", Value::Text(kind.as_str().into()));
    }
    if let Some(campaign) = &filter.campaign_id {
        push("campaign_id =", Value::Text(campaign.clone()));
    }
    if let Some(is_read) = filter.is_read {
        push("is_read =", Value::Integer(i64::from(is_read)));
    }
    if let Some(from) = &filter.created_from {
        push("created_at >=", Value::Text(timestamp(from)));
    }
    if let Some(to) = &filter.created_to {
        push("created_at <=", Value::Text(timestamp(to)));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn latest_active(
    conn: &Connection,
    campaign_id: &str,
    alert_type: AlertType,
    since: DateTime<Utc>,
) -> Result<Option<Alert>, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             WHERE campaign_id = ?1 AND alert_type = ?2 AND status = ?3 AND created_at >= ?4 \
             ORDER BY created_at DESC LIMIT 1"
        ),
        params![
            campaign_id,
            alert_type.as_str(),
            AlertStatus::Active.as_str(),
            timestamp(&since)
        ],
        parse_alert_row,
    )
    .optional()
    .map_err(|e| StoreError::ReadFailed(e.to_string()))
}

fn insert(conn: &Connection, alert: &Alert) -> Result<(), StoreError> {
    let detail =
        serde_json::to_string(&alert.detail).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    conn.execute(
        &format!(
            "INSERT INTO alerts ({ALERT_COLUMNS}, priority_rank) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ),
        params![
            alert.id.to_string(),
            alert.campaign_id,
            alert.recipient_id,
            alert.alert_type.as_str(),
            alert.priority.as_str(),
            alert.status.as_str(),
            alert.title,
            alert.message,
            alert.threshold,
            alert.current_value,
            alert.previous_value,
            detail,
            alert.is_read,
            alert.read_at.as_ref().map(timestamp),
            alert.email_sent,
            alert.chat_sent,
            timestamp(&alert.created_at),
            timestamp(&alert.updated_at),
            alert.resolved_at.as_ref().map(timestamp),
            priority_rank(alert.priority),
        ],
    )
    .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl AlertStore for SqliteStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        drop(conn);
        Ok(())
    }

    async fn find_active_since(
        &self,
        campaign_id: &str,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        let found = latest_active(&conn, campaign_id, alert_type, since)?;
        drop(conn);
        Ok(found)
    }

    async fn create_unless_active(
        &self,
        alert: &Alert,
        since: DateTime<Utc>,
    ) -> Result<CreateOutcome, StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        // IMMEDIATE takes the write lock up front, so a second process blocks
        // (up to busy_timeout) before its lookup instead of after it.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let outcome = match latest_active(&tx, &alert.campaign_id, alert.alert_type, since)? {
            Some(existing) => CreateOutcome::Existing(existing),
            None => {
                insert(&tx, alert)?;
                CreateOutcome::Created(alert.clone())
            }
        };
        tx.commit().map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(outcome)
    }

    async fn create(&self, alert: &Alert) -> Result<Alert, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        insert(&conn, alert)?;
        drop(conn);
        Ok(alert.clone())
    }

    async fn update(&self, id: Uuid, update: &AlertUpdate) -> Result<Alert, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let mut alert = fetch(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("alert {id}")))?;
        update.apply_to(&mut alert);
        write_back(&conn, &alert)?;
        drop(conn);
        Ok(alert)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        let alert = fetch(&conn, id)?;
        drop(conn);
        Ok(alert)
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: &Pagination,
    ) -> Result<AlertPage, StoreError> {
        let (where_sql, values) = where_clause(filter);
        // SQLite reads a negative LIMIT as "no limit"
        let limit = i64::try_from(pagination.per_page).unwrap_or(-1);
        let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);

        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM alerts {where_sql}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let mut page_values = values;
        page_values.push(Value::Integer(limit));
        page_values.push(Value::Integer(offset));
        let limit_idx = page_values.len() - 1;
        let offset_idx = page_values.len();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ALERT_COLUMNS} FROM alerts {where_sql} {LISTING_ORDER} \
                 LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
            ))
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let alerts = stmt
            .query_map(params_from_iter(page_values.iter()), parse_alert_row)
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        drop(stmt);
        drop(conn);
        Ok(AlertPage {
            alerts,
            total: usize::try_from(total).unwrap_or_default(),
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let mut alert = fetch(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("alert {id}")))?;
        alert.status = status;
        alert.updated_at = at;
        if status.is_terminal() {
            alert.resolved_at = Some(at);
        }
        write_back(&conn, &alert)?;
        drop(conn);
        Ok(alert)
    }

    async fn mark_all_read(&self, recipient_id: &str, at: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let changed = conn
            .execute(
                "UPDATE alerts SET is_read = 1, read_at = ?2 WHERE recipient_id = ?1 AND is_read = 0",
                params![recipient_id, timestamp(&at)],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(changed)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let removed = conn
            .execute("DELETE FROM alerts WHERE id = ?1", params![id.to_string()])
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        if removed == 0 {
            return Err(StoreError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }
}
