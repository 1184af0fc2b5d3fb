//! Consent record lifecycle — creation, reads, status transitions.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use consentd_core::{CompliancePolicy, Error, Result};
use consentd_store::{
    AuditAction, AuditLog, ConsentFilter, ConsentRecord, ConsentStatus, ConsentStore,
    ConsentType, ConsentUpdate,
};

/// Version stamped on every record at creation.
const CONSENT_VERSION: &str = "1.0.0";

/// Actor identity used for system-initiated audit events.
const SYSTEM_ACTOR: &str = "system";

/// A pre-validated request to record a consent decision.
///
/// Field constraints (bounded strings, valid IP, non-empty collections) are
/// enforced by the caller before this reaches the engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub user_id: String,
    pub session_id: String,
    pub consent_type: ConsentType,
    pub consent_status: ConsentStatus,
    pub ip_address: String,
    pub user_agent: String,
    pub purpose: String,
    pub data_categories: Vec<String>,
    pub processing_activities: Vec<String>,
    pub third_party_sharing: bool,
}

/// Compliance justification for processing under a consent category.
pub fn derive_legal_basis(consent_type: &str) -> &'static str {
    match consent_type {
        "necessary" => "Legitimate interest - essential for website functionality",
        "functional" => "Consent - enhances user experience",
        "analytics" => "Consent - website analytics and performance monitoring",
        "marketing" => "Consent - targeted advertising and marketing",
        "all" => "Consent - all cookie categories",
        _ => "Consent",
    }
}

/// Creates and manages consent records, writing an audit entry for every
/// state change and every direct record read.
pub struct ConsentService {
    store: Arc<ConsentStore>,
    policy: CompliancePolicy,
    data_controller: String,
    data_processor: String,
}

impl ConsentService {
    pub fn new(
        store: Arc<ConsentStore>,
        policy: CompliancePolicy,
        data_controller: impl Into<String>,
        data_processor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            policy,
            data_controller: data_controller.into(),
            data_processor: data_processor.into(),
        }
    }

    /// Record a new consent decision. Computes expiry and legal basis from
    /// the current policy, persists the record, and audits the creation.
    pub fn record_consent(&self, request: &ConsentRequest) -> Result<ConsentRecord> {
        let now = Utc::now();
        let retention_days = self.policy.consent_retention_days;

        let record = ConsentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            consent_type: request.consent_type,
            consent_status: request.consent_status,
            timestamp: now,
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            consent_version: CONSENT_VERSION.to_string(),
            data_retention_period: retention_days,
            purpose: request.purpose.clone(),
            legal_basis: derive_legal_basis(request.consent_type.as_str()).to_string(),
            data_controller: self.data_controller.clone(),
            data_processor: self.data_processor.clone(),
            third_party_sharing: request.third_party_sharing,
            data_categories: request.data_categories.clone(),
            processing_activities: request.processing_activities.clone(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(retention_days),
            is_anonymized: false,
            anonymized_at: None,
        };

        self.store.create(&record)?;

        self.store.append_audit_log(&AuditLog {
            id: uuid::Uuid::new_v4().to_string(),
            consent_id: record.id.clone(),
            action: AuditAction::Created,
            timestamp: now,
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            details: format!(
                "Consent {} for {} cookies",
                request.consent_status.as_str(),
                request.consent_type.as_str()
            ),
            performed_by: request.user_id.clone(),
        })?;

        info!("Consent recorded: {}", record.id);
        Ok(record)
    }

    /// Look up a record by id. A hit is itself an auditable compliance event
    /// and appends an `accessed` entry; a miss writes nothing.
    pub fn get_by_id(&self, id: &str) -> Result<Option<ConsentRecord>> {
        let record = self.store.get_by_id(id)?;

        if record.is_some() {
            self.store.append_audit_log(&AuditLog {
                id: uuid::Uuid::new_v4().to_string(),
                consent_id: id.to_string(),
                action: AuditAction::Accessed,
                timestamp: Utc::now(),
                ip_address: SYSTEM_ACTOR.to_string(),
                user_agent: SYSTEM_ACTOR.to_string(),
                details: "Consent record accessed".to_string(),
                performed_by: SYSTEM_ACTOR.to_string(),
            })?;
        }

        Ok(record)
    }

    /// Change a record's consent status.
    ///
    /// Rejects any status outside {granted, denied, withdrawn} before
    /// touching the store; an unknown id returns `None`. In both cases no
    /// audit entry is written. Returns the re-read, post-update record.
    pub fn update_status(
        &self,
        id: &str,
        new_status: &str,
        actor_id: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<Option<ConsentRecord>> {
        let status = ConsentStatus::parse(new_status)
            .ok_or_else(|| Error::Validation(format!("Invalid consent status: {}", new_status)))?;

        if self.store.get_by_id(id)?.is_none() {
            return Ok(None);
        }

        self.store.update(
            id,
            &ConsentUpdate {
                consent_status: Some(status),
                ..Default::default()
            },
        )?;

        let action = if status == ConsentStatus::Withdrawn {
            AuditAction::Withdrawn
        } else {
            AuditAction::Updated
        };

        self.store.append_audit_log(&AuditLog {
            id: uuid::Uuid::new_v4().to_string(),
            consent_id: id.to_string(),
            action,
            timestamp: Utc::now(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            details: format!("Consent status changed to {}", status.as_str()),
            performed_by: actor_id.to_string(),
        })?;

        info!("Consent status updated: {} -> {}", id, status.as_str());
        self.store.get_by_id(id)
    }

    /// Audit entries for a record, newest first. Empty for an unknown id.
    pub fn get_audit_trail(&self, consent_id: &str) -> Result<Vec<AuditLog>> {
        self.store.audit_logs_for(consent_id)
    }

    /// Records matching the filter plus the total count ignoring pagination.
    pub fn list_consents(&self, filter: &ConsentFilter) -> Result<(Vec<ConsentRecord>, i64)> {
        let records = self.store.list(filter)?;
        let total = self.store.count(filter)?;
        Ok((records, total))
    }

    /// Read-only snapshot of the policy in effect.
    pub fn compliance_config(&self) -> CompliancePolicy {
        self.policy.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_service() -> (ConsentService, Arc<ConsentStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ConsentStore::open(dir.path()).unwrap());
        let service = ConsentService::new(
            store.clone(),
            CompliancePolicy::default(),
            "Test Controller",
            "Test Processor",
        );
        (service, store, dir)
    }

    fn request() -> ConsentRequest {
        ConsentRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            consent_type: ConsentType::Analytics,
            consent_status: ConsentStatus::Granted,
            ip_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            purpose: "Website analytics".to_string(),
            data_categories: vec!["behavioral".to_string()],
            processing_activities: vec!["analytics".to_string()],
            third_party_sharing: false,
        }
    }

    #[test]
    fn test_record_consent_computes_expiry_and_audits() {
        let (service, _store, _dir) = test_service();
        let record = service.record_consent(&request()).unwrap();

        assert_eq!(
            record.expires_at,
            record.created_at + Duration::days(2555)
        );
        assert_eq!(record.data_retention_period, 2555);
        assert_eq!(record.consent_version, "1.0.0");
        assert_eq!(record.timestamp, record.created_at);
        assert_eq!(
            record.legal_basis,
            "Consent - website analytics and performance monitoring"
        );
        assert_eq!(record.data_controller, "Test Controller");
        assert!(!record.is_anonymized);

        let trail = service.get_audit_trail(&record.id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Created);
        assert_eq!(trail[0].details, "Consent granted for analytics cookies");
        assert_eq!(trail[0].performed_by, "user-1");
    }

    #[test]
    fn test_derive_legal_basis_table() {
        assert_eq!(
            derive_legal_basis("necessary"),
            "Legitimate interest - essential for website functionality"
        );
        assert_eq!(
            derive_legal_basis("functional"),
            "Consent - enhances user experience"
        );
        assert_eq!(
            derive_legal_basis("analytics"),
            "Consent - website analytics and performance monitoring"
        );
        assert_eq!(
            derive_legal_basis("marketing"),
            "Consent - targeted advertising and marketing"
        );
        assert_eq!(derive_legal_basis("all"), "Consent - all cookie categories");
        // Closed input validation should keep this unreachable in practice.
        assert_eq!(derive_legal_basis("biometric"), "Consent");
    }

    #[test]
    fn test_get_by_id_audits_the_read() {
        let (service, _store, _dir) = test_service();
        let record = service.record_consent(&request()).unwrap();

        let loaded = service.get_by_id(&record.id).unwrap().unwrap();
        assert_eq!(loaded.id, record.id);

        let trail = service.get_audit_trail(&record.id).unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action, AuditAction::Accessed);
        assert_eq!(trail[0].performed_by, "system");
        assert_eq!(trail[0].ip_address, "system");
        assert_eq!(trail[0].user_agent, "system");
    }

    #[test]
    fn test_get_by_id_miss_writes_no_audit() {
        let (service, _store, _dir) = test_service();
        assert!(service.get_by_id("missing").unwrap().is_none());
        assert!(service.get_audit_trail("missing").unwrap().is_empty());
    }

    #[test]
    fn test_update_status_withdrawn_audits_withdrawal() {
        let (service, _store, _dir) = test_service();
        let record = service.record_consent(&request()).unwrap();

        let updated = service
            .update_status(&record.id, "withdrawn", "user-1", "203.0.113.7", "Mozilla/5.0")
            .unwrap()
            .unwrap();
        assert_eq!(updated.consent_status, ConsentStatus::Withdrawn);

        let trail = service.get_audit_trail(&record.id).unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action, AuditAction::Withdrawn);
        assert_eq!(trail[0].details, "Consent status changed to withdrawn");
    }

    #[test]
    fn test_update_status_other_statuses_audit_updated() {
        let (service, _store, _dir) = test_service();
        let record = service.record_consent(&request()).unwrap();

        let updated = service
            .update_status(&record.id, "denied", "user-1", "203.0.113.7", "Mozilla/5.0")
            .unwrap()
            .unwrap();
        assert_eq!(updated.consent_status, ConsentStatus::Denied);

        let trail = service.get_audit_trail(&record.id).unwrap();
        assert_eq!(trail[0].action, AuditAction::Updated);
    }

    #[test]
    fn test_update_status_invalid_value_rejected_before_write() {
        let (service, _store, _dir) = test_service();
        let record = service.record_consent(&request()).unwrap();

        let result =
            service.update_status(&record.id, "approved", "user-1", "ip", "ua");
        assert!(matches!(result, Err(Error::Validation(_))));

        // Record and trail unchanged.
        let reloaded = service.get_audit_trail(&record.id).unwrap();
        assert_eq!(reloaded.len(), 1);
        let unchanged = service.list_consents(&ConsentFilter::default()).unwrap().0;
        assert_eq!(unchanged[0].consent_status, ConsentStatus::Granted);
    }

    #[test]
    fn test_update_status_unknown_id_writes_nothing() {
        let (service, _store, _dir) = test_service();
        let result = service
            .update_status("missing", "granted", "user-1", "ip", "ua")
            .unwrap();
        assert!(result.is_none());
        assert!(service.get_audit_trail("missing").unwrap().is_empty());
    }

    #[test]
    fn test_list_consents_total_ignores_pagination() {
        let (service, _store, _dir) = test_service();
        for _ in 0..3 {
            service.record_consent(&request()).unwrap();
        }

        let filter = ConsentFilter {
            limit: Some(1),
            ..Default::default()
        };
        let (records, total) = service.list_consents(&filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(total, 3);
    }

    #[test]
    fn test_compliance_config_snapshot() {
        let (service, _store, _dir) = test_service();
        let config = service.compliance_config();
        assert_eq!(config.consent_retention_days, 2555);
        assert!(config.anonymization_required);
    }
}
