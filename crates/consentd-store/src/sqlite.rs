//! SQLite-based consent record store.
//!
//! Owns the persisted state for both collections (consent records and audit
//! logs). Every mutating call commits before returning; a single connection
//! behind a mutex serializes writers, and reads through the same lock always
//! observe a consistent snapshot.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::info;

use crate::schema::SCHEMA_SQL;
use crate::types::*;
use consentd_core::{Error, Result};

/// SQLite store for consent records and their audit trail.
pub struct ConsentStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl ConsentStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/consentdb/`). The file will be
    /// `db_dir/consentd.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("consentd.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let record_count = store.count(&ConsentFilter::default())?;
        info!(
            "ConsentStore initialized: {} records, path={}",
            record_count,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        // synchronous=FULL: consent and audit writes must survive a crash
        // immediately after a successful call.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = FULL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Consent record CRUD
    // ---------------------------------------------------------------

    /// Append a new consent record. Never mutates an existing record.
    pub fn create(&self, record: &ConsentRecord) -> Result<()> {
        let categories = serde_json::to_string(&record.data_categories)?;
        let activities = serde_json::to_string(&record.processing_activities)?;

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO consent_records (
                 id, user_id, session_id, consent_type, consent_status,
                 timestamp, ip_address, user_agent, consent_version,
                 data_retention_period, purpose, legal_basis, data_controller,
                 data_processor, third_party_sharing, data_categories,
                 processing_activities, created_at, updated_at, expires_at,
                 is_anonymized, anonymized_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                       ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            record.id,
            record.user_id,
            record.session_id,
            record.consent_type.as_str(),
            record.consent_status.as_str(),
            record.timestamp.timestamp_millis(),
            record.ip_address,
            record.user_agent,
            record.consent_version,
            record.data_retention_period,
            record.purpose,
            record.legal_basis,
            record.data_controller,
            record.data_processor,
            record.third_party_sharing,
            categories,
            activities,
            record.created_at.timestamp_millis(),
            record.updated_at.timestamp_millis(),
            record.expires_at.timestamp_millis(),
            record.is_anonymized,
            record.anonymized_at.map(|t| t.timestamp_millis()),
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a consent record by id. Absence is `None`, not an error.
    pub fn get_by_id(&self, id: &str) -> Result<Option<ConsentRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM consent_records WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], |row| Ok(Self::row_to_record(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// List records matching all set filter fields, newest first.
    /// `limit`/`offset` apply after filtering and sorting.
    pub fn list(&self, filter: &ConsentFilter) -> Result<Vec<ConsentRecord>> {
        let (where_sql, filter_params) = Self::filter_clauses(filter);
        let mut sql = format!(
            "SELECT * FROM consent_records {} ORDER BY timestamp DESC, rowid DESC",
            where_sql
        );
        if filter.limit.is_some() || filter.offset.is_some() {
            // LIMIT -1 is SQLite's "no limit", needed when only offset is set.
            sql.push_str(&format!(
                " LIMIT {} OFFSET {}",
                filter.limit.unwrap_or(-1),
                filter.offset.unwrap_or(0)
            ));
        }

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(filter_params), |row| {
                Ok(Self::row_to_record(row))
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Count records matching the filter, ignoring `limit`/`offset`.
    pub fn count(&self, filter: &ConsentFilter) -> Result<i64> {
        let (where_sql, filter_params) = Self::filter_clauses(filter);
        let sql = format!("SELECT COUNT(*) FROM consent_records {}", where_sql);

        let conn = self.conn.lock();
        let count: i64 = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params_from_iter(filter_params), |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Merge the set fields into an existing record and bump `updated_at`.
    /// Silently a no-op when the id is unknown.
    pub fn update(&self, id: &str, update: &ConsentUpdate) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut sets = vec!["updated_at = ?".to_string()];
        let mut values: Vec<Value> = vec![Value::Integer(now)];

        if let Some(status) = &update.consent_status {
            sets.push("consent_status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(purpose) = &update.purpose {
            sets.push("purpose = ?".to_string());
            values.push(Value::Text(purpose.clone()));
        }
        values.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE consent_records SET {} WHERE id = ?",
            sets.join(", ")
        );

        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(values))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Audit log
    // ---------------------------------------------------------------

    /// Append an audit entry. Entries are never edited afterwards.
    pub fn append_audit_log(&self, entry: &AuditLog) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO audit_logs (
                 id, consent_id, action, timestamp, ip_address, user_agent,
                 details, performed_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            entry.id,
            entry.consent_id,
            entry.action.as_str(),
            entry.timestamp.timestamp_millis(),
            entry.ip_address,
            entry.user_agent,
            entry.details,
            entry.performed_by,
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Audit entries for a consent record, newest first.
    pub fn audit_logs_for(&self, consent_id: &str) -> Result<Vec<AuditLog>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM audit_logs WHERE consent_id = ?1 \
                 ORDER BY timestamp DESC, rowid DESC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![consent_id], |row| Ok(Self::row_to_audit(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ---------------------------------------------------------------
    // Retention sweeps
    // ---------------------------------------------------------------

    /// Delete every record with `expires_at <= now`. Returns the count.
    pub fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "DELETE FROM consent_records WHERE expires_at <= ?1",
                params![now.timestamp_millis()],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Irreversibly mask identifying fields on expired, not-yet-anonymized
    /// records. Already-anonymized rows are untouched, so the sweep is
    /// idempotent and `anonymized_at` is set exactly once.
    pub fn anonymize_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE consent_records
                    SET user_id = ?2 || substr(user_id, 1, 8),
                        ip_address = ?3,
                        user_agent = ?3,
                        is_anonymized = 1,
                        anonymized_at = ?1,
                        updated_at = ?1
                  WHERE expires_at <= ?1 AND is_anonymized = 0",
                params![
                    now.timestamp_millis(),
                    ANONYMIZED_ID_PREFIX,
                    ANONYMIZED_PLACEHOLDER
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // Filter and row mapping helpers
    // ---------------------------------------------------------------

    fn filter_clauses(filter: &ConsentFilter) -> (String, Vec<Value>) {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(user_id) = &filter.user_id {
            clauses.push("user_id = ?");
            values.push(Value::Text(user_id.clone()));
        }
        if let Some(session_id) = &filter.session_id {
            clauses.push("session_id = ?");
            values.push(Value::Text(session_id.clone()));
        }
        if let Some(consent_type) = filter.consent_type {
            clauses.push("consent_type = ?");
            values.push(Value::Text(consent_type.as_str().to_string()));
        }
        if let Some(consent_status) = filter.consent_status {
            clauses.push("consent_status = ?");
            values.push(Value::Text(consent_status.as_str().to_string()));
        }
        if let Some(start) = filter.start_date {
            clauses.push("timestamp >= ?");
            values.push(Value::Integer(start.timestamp_millis()));
        }
        if let Some(end) = filter.end_date {
            clauses.push("timestamp <= ?");
            values.push(Value::Integer(end.timestamp_millis()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        (where_sql, values)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> ConsentRecord {
        ConsentRecord {
            id: row.get("id").unwrap_or_default(),
            user_id: row.get("user_id").unwrap_or_default(),
            session_id: row.get("session_id").unwrap_or_default(),
            consent_type: row
                .get::<_, String>("consent_type")
                .ok()
                .and_then(|s| ConsentType::parse(&s))
                .unwrap_or(ConsentType::Necessary),
            consent_status: row
                .get::<_, String>("consent_status")
                .ok()
                .and_then(|s| ConsentStatus::parse(&s))
                .unwrap_or(ConsentStatus::Denied),
            timestamp: ms_to_utc(row.get("timestamp").unwrap_or(0)),
            ip_address: row.get("ip_address").unwrap_or_default(),
            user_agent: row.get("user_agent").unwrap_or_default(),
            consent_version: row.get("consent_version").unwrap_or_default(),
            data_retention_period: row.get("data_retention_period").unwrap_or(0),
            purpose: row.get("purpose").unwrap_or_default(),
            legal_basis: row.get("legal_basis").unwrap_or_default(),
            data_controller: row.get("data_controller").unwrap_or_default(),
            data_processor: row.get("data_processor").unwrap_or_default(),
            third_party_sharing: row.get("third_party_sharing").unwrap_or(false),
            data_categories: json_string_vec(row.get::<_, String>("data_categories").ok()),
            processing_activities: json_string_vec(
                row.get::<_, String>("processing_activities").ok(),
            ),
            created_at: ms_to_utc(row.get("created_at").unwrap_or(0)),
            updated_at: ms_to_utc(row.get("updated_at").unwrap_or(0)),
            expires_at: ms_to_utc(row.get("expires_at").unwrap_or(0)),
            is_anonymized: row.get("is_anonymized").unwrap_or(false),
            anonymized_at: row
                .get::<_, Option<i64>>("anonymized_at")
                .ok()
                .flatten()
                .map(ms_to_utc),
        }
    }

    fn row_to_audit(row: &rusqlite::Row<'_>) -> AuditLog {
        AuditLog {
            id: row.get("id").unwrap_or_default(),
            consent_id: row.get("consent_id").unwrap_or_default(),
            action: row
                .get::<_, String>("action")
                .ok()
                .and_then(|s| AuditAction::parse(&s))
                .unwrap_or(AuditAction::Accessed),
            timestamp: ms_to_utc(row.get("timestamp").unwrap_or(0)),
            ip_address: row.get("ip_address").unwrap_or_default(),
            user_agent: row.get("user_agent").unwrap_or_default(),
            details: row.get("details").unwrap_or_default(),
            performed_by: row.get("performed_by").unwrap_or_default(),
        }
    }
}

fn ms_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

fn json_string_vec(raw: Option<String>) -> Vec<String> {
    raw.as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}
