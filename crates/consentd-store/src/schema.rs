//! Database schema SQL — consent records and audit logs.

/// Core tables: consent_records, audit_logs.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS consent_records (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    consent_type TEXT NOT NULL,
    consent_status TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    ip_address TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    consent_version TEXT NOT NULL,
    data_retention_period INTEGER NOT NULL,
    purpose TEXT NOT NULL,
    legal_basis TEXT NOT NULL,
    data_controller TEXT NOT NULL,
    data_processor TEXT NOT NULL,
    third_party_sharing INTEGER NOT NULL,
    data_categories TEXT NOT NULL,
    processing_activities TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    is_anonymized INTEGER NOT NULL DEFAULT 0,
    anonymized_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_consent_user ON consent_records(user_id);
CREATE INDEX IF NOT EXISTS idx_consent_session ON consent_records(session_id);
CREATE INDEX IF NOT EXISTS idx_consent_timestamp ON consent_records(timestamp);
CREATE INDEX IF NOT EXISTS idx_consent_expires ON consent_records(expires_at);

CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY,
    consent_id TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    ip_address TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    details TEXT NOT NULL,
    performed_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_consent ON audit_logs(consent_id);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_logs(timestamp);
"#;
