//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all consentd data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Consent database directory (`data/consentdb/`).
    pub consentdb: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            consentdb: root.join("consentdb"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.consentdb)?;
        Ok(())
    }
}

/// Retention policy and descriptive compliance posture.
///
/// Fixed at process start; the boolean flags are reported in compliance
/// output but never enforced in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompliancePolicy {
    pub consent_retention_days: i64,
    pub audit_log_retention_days: i64,
    pub anonymization_required: bool,
    pub data_minimization: bool,
    pub purpose_limitation: bool,
    pub storage_limitation: bool,
    pub accuracy_requirement: bool,
    pub security_measures: bool,
    pub accountability: bool,
}

impl CompliancePolicy {
    /// Read retention windows from the environment, defaulting to 2555 days
    /// (roughly seven years).
    pub fn from_env() -> Self {
        Self {
            consent_retention_days: env_i64("CONSENT_RETENTION_DAYS", 2555),
            audit_log_retention_days: env_i64("AUDIT_LOG_RETENTION_DAYS", 2555),
            anonymization_required: true,
            data_minimization: true,
            purpose_limitation: true,
            storage_limitation: true,
            accuracy_requirement: true,
            security_measures: true,
            accountability: true,
        }
    }
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self {
            consent_retention_days: 2555,
            audit_log_retention_days: 2555,
            anonymization_required: true,
            data_minimization: true,
            purpose_limitation: true,
            storage_limitation: true,
            accuracy_requirement: true,
            security_measures: true,
            accountability: true,
        }
    }
}

/// Top-level consentd configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentdConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Retention policy in effect for new records.
    pub policy: CompliancePolicy,
    /// Controller identity stamped on every record.
    pub data_controller: String,
    /// Processor identity stamped on every record.
    pub data_processor: String,
}

impl ConsentdConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5001);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            policy: CompliancePolicy::from_env(),
            data_controller: std::env::var("DATA_CONTROLLER")
                .unwrap_or_else(|_| "Redacto Cookie Consent".to_string()),
            data_processor: std::env::var("DATA_PROCESSOR")
                .unwrap_or_else(|_| "Redacto Cookie Consent Backend".to_string()),
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_windows() {
        let policy = CompliancePolicy::default();
        assert_eq!(policy.consent_retention_days, 2555);
        assert_eq!(policy.audit_log_retention_days, 2555);
        assert!(policy.anonymization_required);
        assert!(policy.accountability);
    }

    #[test]
    fn test_policy_serializes_camel_case() {
        let json = serde_json::to_value(CompliancePolicy::default()).unwrap();
        assert!(json["consentRetentionDays"].is_number());
        assert!(json["anonymizationRequired"].is_boolean());
    }
}
