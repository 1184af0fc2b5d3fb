//! Data types for consent records and audit logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder written into identifying fields by the anonymization sweep.
pub const ANONYMIZED_PLACEHOLDER: &str = "anonymized";

/// Prefix prepended to the masked user id by the anonymization sweep.
pub const ANONYMIZED_ID_PREFIX: &str = "anonymized_";

/// Cookie category a consent decision applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentType {
    Necessary,
    Functional,
    Analytics,
    Marketing,
    All,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Necessary => "necessary",
            Self::Functional => "functional",
            Self::Analytics => "analytics",
            Self::Marketing => "marketing",
            Self::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "necessary" => Some(Self::Necessary),
            "functional" => Some(Self::Functional),
            "analytics" => Some(Self::Analytics),
            "marketing" => Some(Self::Marketing),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// The decision recorded for a consent category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Granted,
    Denied,
    Withdrawn,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

/// Action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Updated,
    Withdrawn,
    Anonymized,
    Deleted,
    Accessed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Withdrawn => "withdrawn",
            Self::Anonymized => "anonymized",
            Self::Deleted => "deleted",
            Self::Accessed => "accessed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "withdrawn" => Some(Self::Withdrawn),
            "anonymized" => Some(Self::Anonymized),
            "deleted" => Some(Self::Deleted),
            "accessed" => Some(Self::Accessed),
            _ => None,
        }
    }
}

/// One user's decision for one consent category, with compliance metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub consent_type: ConsentType,
    pub consent_status: ConsentStatus,
    /// Creation time; immutable after creation.
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
    pub consent_version: String,
    /// Retention window in days, fixed from policy at creation.
    pub data_retention_period: i64,
    pub purpose: String,
    pub legal_basis: String,
    pub data_controller: String,
    pub data_processor: String,
    pub third_party_sharing: bool,
    pub data_categories: Vec<String>,
    pub processing_activities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `created_at` plus the retention window; never re-derived.
    pub expires_at: DateTime<Utc>,
    pub is_anonymized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymized_at: Option<DateTime<Utc>>,
}

/// Immutable append-only event tied to a consent record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    /// Back-reference to the consent record; not an ownership edge, so audit
    /// entries survive deletion of the record they describe.
    pub consent_id: String,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
    pub details: String,
    pub performed_by: String,
}

/// Conjunctive filter over consent records; an unset field imposes no
/// constraint. `limit`/`offset` apply after filtering and sorting.
#[derive(Debug, Clone, Default)]
pub struct ConsentFilter {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub consent_type: Option<ConsentType>,
    pub consent_status: Option<ConsentStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Partial update merged into an existing record. `updated_at` is bumped on
/// every update regardless of which fields are set.
#[derive(Debug, Clone, Default)]
pub struct ConsentUpdate {
    pub consent_status: Option<ConsentStatus>,
    pub purpose: Option<String>,
}
