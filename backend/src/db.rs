use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use fhe_policy::events::LedgerEvent;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str, max_connections: u32) -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
        .map_err(|_| ApiError::Internal)
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // Append-only event log. Records themselves live in the ledger.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS events (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  created_at TEXT NOT NULL,
  kind TEXT NOT NULL,
  payload_json TEXT NOT NULL
);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

pub async fn insert_event(db: &Db, event: &LedgerEvent) -> Result<i64, ApiError> {
    let created_at = Utc::now().to_rfc3339();
    let payload_json = serde_json::to_string(event).map_err(|_| ApiError::Internal)?;

    let res = sqlx::query(r#"INSERT INTO events (created_at, kind, payload_json) VALUES (?, ?, ?)"#)
        .bind(created_at)
        .bind(event.name())
        .bind(payload_json)
        .execute(db)
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(res.last_insert_rowid())
}

pub async fn count_events(db: &Db) -> Result<u64, ApiError> {
    let row = sqlx::query(r#"SELECT COUNT(*) AS c FROM events"#)
        .fetch_one(db)
        .await
        .map_err(|_| ApiError::Internal)?;
    let c: i64 = row.get("c");
    Ok(c as u64)
}

pub async fn list_events(
    db: &Db,
    offset: u64,
    limit: u64,
) -> Result<Vec<(i64, DateTime<Utc>, LedgerEvent)>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT seq, created_at, payload_json
           FROM events
           ORDER BY seq
           LIMIT ? OFFSET ?"#,
    )
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let seq: i64 = row.get(0);
        let created_at: String = row.get(1);
        let payload_json: String = row.get(2);

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|_| ApiError::Internal)?
            .with_timezone(&Utc);
        let event: LedgerEvent = serde_json::from_str(&payload_json).map_err(|_| ApiError::Internal)?;

        out.push((seq, created_at, event));
    }

    Ok(out)
}
