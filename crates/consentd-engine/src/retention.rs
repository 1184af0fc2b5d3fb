//! Retention cleanup and compliance integrity checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use consentd_core::{CompliancePolicy, Result};
use consentd_store::{AuditAction, AuditLog, ConsentFilter, ConsentStore};

/// Actor identity stamped on sweep audit entries.
const SYSTEM_ACTOR: &str = "system";

/// Outcome of a retention cleanup run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub anonymized: usize,
}

/// Outcome of an integrity scan. Never an error: store failures are folded
/// into `issues`.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Sweeps expired consent records and validates retention-policy invariants.
pub struct RetentionValidator {
    store: Arc<ConsentStore>,
    policy: CompliancePolicy,
}

impl RetentionValidator {
    pub fn new(store: Arc<ConsentStore>, policy: CompliancePolicy) -> Self {
        Self { store, policy }
    }

    /// Run the retention sweeps: deletion first, then anonymization.
    ///
    /// Deletion before anonymization is deliberate policy: a record whose
    /// retention window has fully lapsed is removed outright and never
    /// anonymized. Each sweep appends one audit entry carrying its count.
    /// Idempotent: an immediate second run reports zero for both sweeps.
    pub fn perform_cleanup(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let deleted = self.store.delete_expired(now)?;
        self.append_sweep_audit(
            AuditAction::Deleted,
            format!("Retention sweep deleted {} expired consent records", deleted),
            now,
        )?;

        let anonymized = self.store.anonymize_expired(now)?;
        self.append_sweep_audit(
            AuditAction::Anonymized,
            format!(
                "Retention sweep anonymized {} expired consent records",
                anonymized
            ),
            now,
        )?;

        info!(
            "Retention cleanup complete: {} deleted, {} anonymized",
            deleted, anonymized
        );
        Ok(CleanupReport { deleted, anonymized })
    }

    /// Scan all records for retention-policy violations.
    ///
    /// Reports, never corrects: an expired-but-unanonymized record is flagged
    /// rather than cleaned up, and a stored retention period exceeding the
    /// current policy limit (possible after the policy was tightened) is
    /// flagged rather than rewritten.
    pub fn validate_integrity(&self) -> IntegrityReport {
        let mut issues = Vec::new();

        match self.store.list(&ConsentFilter::default()) {
            Ok(records) => {
                let now = Utc::now();
                for record in &records {
                    if record.expires_at <= now && !record.is_anonymized {
                        issues.push(format!(
                            "Record {} has expired but is not anonymized",
                            record.id
                        ));
                    }
                    if record.data_retention_period > self.policy.consent_retention_days {
                        issues.push(format!(
                            "Record {} has retention period exceeding compliance limit",
                            record.id
                        ));
                    }
                }
            }
            Err(e) => {
                warn!("Integrity check could not read the store: {}", e);
                issues.push(format!("Store integrity check failed: {}", e));
            }
        }

        IntegrityReport {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// Current policy snapshot, reported alongside compliance results.
    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    fn append_sweep_audit(
        &self,
        action: AuditAction,
        details: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store.append_audit_log(&AuditLog {
            id: uuid::Uuid::new_v4().to_string(),
            consent_id: SYSTEM_ACTOR.to_string(),
            action,
            timestamp: now,
            ip_address: SYSTEM_ACTOR.to_string(),
            user_agent: SYSTEM_ACTOR.to_string(),
            details,
            performed_by: SYSTEM_ACTOR.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use consentd_store::{ConsentRecord, ConsentStatus, ConsentType};
    use tempfile::TempDir;

    fn test_validator() -> (RetentionValidator, Arc<ConsentStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ConsentStore::open(dir.path()).unwrap());
        let validator = RetentionValidator::new(store.clone(), CompliancePolicy::default());
        (validator, store, dir)
    }

    fn record(id: &str, created: DateTime<Utc>, expires: DateTime<Utc>) -> ConsentRecord {
        ConsentRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            consent_type: ConsentType::Marketing,
            consent_status: ConsentStatus::Granted,
            timestamp: created,
            ip_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            consent_version: "1.0.0".to_string(),
            data_retention_period: 2555,
            purpose: "Marketing".to_string(),
            legal_basis: "Consent - targeted advertising and marketing".to_string(),
            data_controller: "Test Controller".to_string(),
            data_processor: "Test Processor".to_string(),
            third_party_sharing: true,
            data_categories: vec!["behavioral".to_string()],
            processing_activities: vec!["advertising".to_string()],
            created_at: created,
            updated_at: created,
            expires_at: expires,
            is_anonymized: false,
            anonymized_at: None,
        }
    }

    #[test]
    fn test_cleanup_deletes_before_anonymizing() {
        let (validator, store, _dir) = test_validator();
        let now = Utc::now();

        store
            .create(&record("expired", now - Duration::days(3000), now - Duration::days(1)))
            .unwrap();
        store
            .create(&record("fresh", now, now + Duration::days(2555)))
            .unwrap();

        let report = validator.perform_cleanup(now).unwrap();
        // Expired record is removed outright, never anonymized.
        assert_eq!(report.deleted, 1);
        assert_eq!(report.anonymized, 0);
        assert!(store.get_by_id("expired").unwrap().is_none());
        assert!(store.get_by_id("fresh").unwrap().is_some());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let (validator, store, _dir) = test_validator();
        let now = Utc::now();

        store
            .create(&record("expired", now - Duration::days(3000), now - Duration::days(1)))
            .unwrap();

        let first = validator.perform_cleanup(now).unwrap();
        assert_eq!(first.deleted, 1);

        let second = validator.perform_cleanup(now).unwrap();
        assert_eq!(second.deleted, 0);
        assert_eq!(second.anonymized, 0);
    }

    #[test]
    fn test_each_sweep_appends_one_audit_entry() {
        let (validator, store, _dir) = test_validator();
        let now = Utc::now();

        store
            .create(&record("expired", now - Duration::days(3000), now - Duration::days(1)))
            .unwrap();
        validator.perform_cleanup(now).unwrap();

        let sweeps = store.audit_logs_for("system").unwrap();
        assert_eq!(sweeps.len(), 2);
        // Newest first: anonymization sweep ran after deletion.
        assert_eq!(sweeps[0].action, AuditAction::Anonymized);
        assert_eq!(sweeps[1].action, AuditAction::Deleted);
        assert!(sweeps[1].details.contains("deleted 1"));
        assert_eq!(sweeps[0].performed_by, "system");
    }

    #[test]
    fn test_integrity_flags_expired_unanonymized() {
        let (validator, store, _dir) = test_validator();
        let now = Utc::now();

        store
            .create(&record("stale", now - Duration::days(3000), now - Duration::days(1)))
            .unwrap();

        let report = validator.validate_integrity();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("stale"));

        // Cleanup removes the record, so a re-scan is clean.
        validator.perform_cleanup(now).unwrap();
        let after = validator.validate_integrity();
        assert!(after.valid);
        assert!(after.issues.is_empty());
    }

    #[test]
    fn test_integrity_flags_retention_exceeding_policy() {
        let (validator, store, _dir) = test_validator();
        let now = Utc::now();

        // Created before the policy was tightened: longer window than allowed.
        let mut rec = record("legacy", now, now + Duration::days(9999));
        rec.data_retention_period = 9999;
        store.create(&rec).unwrap();

        let report = validator.validate_integrity();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("legacy"));
        assert!(report.issues[0].contains("retention period"));
    }

    #[test]
    fn test_integrity_clean_store_is_valid() {
        let (validator, _store, _dir) = test_validator();
        let report = validator.validate_integrity();
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }
}
