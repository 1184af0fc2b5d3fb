//! Request validation — field constraints enforced before the engine runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consentd_engine::ConsentRequest;
use consentd_store::{ConsentFilter, ConsentStatus, ConsentType};

const MAX_ID_LEN: usize = 255;
const MAX_USER_AGENT_LEN: usize = 1000;
const MAX_PURPOSE_LEN: usize = 500;
const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 50;

/// One failed field constraint, reported back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Raw listing query as it arrives on the wire. Enum and bound checks happen
/// in [`validate_logs_query`], which turns this into a `ConsentFilter`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub consent_type: Option<String>,
    pub consent_status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn check_bounded(errors: &mut Vec<FieldError>, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    } else if value.len() > max {
        errors.push(FieldError::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
}

/// Check a consent creation request against the field constraints.
/// Returns the full list of violations; empty means the request is valid.
pub fn validate_consent_request(request: &ConsentRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    check_bounded(&mut errors, "userId", &request.user_id, MAX_ID_LEN);
    check_bounded(&mut errors, "sessionId", &request.session_id, MAX_ID_LEN);

    if request.ip_address.parse::<std::net::IpAddr>().is_err() {
        errors.push(FieldError::new("ipAddress", "must be a valid IP address"));
    }

    check_bounded(
        &mut errors,
        "userAgent",
        &request.user_agent,
        MAX_USER_AGENT_LEN,
    );
    check_bounded(&mut errors, "purpose", &request.purpose, MAX_PURPOSE_LEN);

    if request.data_categories.is_empty() {
        errors.push(FieldError::new("dataCategories", "must not be empty"));
    }
    if request.processing_activities.is_empty() {
        errors.push(FieldError::new(
            "processingActivities",
            "must not be empty",
        ));
    }

    errors
}

/// Validate a listing query and build the store filter, applying the default
/// pagination window (limit 50, offset 0).
pub fn validate_logs_query(query: &LogsQuery) -> Result<ConsentFilter, Vec<FieldError>> {
    let mut errors = Vec::new();

    let consent_type = match &query.consent_type {
        Some(raw) => match ConsentType::parse(raw) {
            Some(t) => Some(t),
            None => {
                errors.push(FieldError::new("consentType", "unknown consent type"));
                None
            }
        },
        None => None,
    };

    let consent_status = match &query.consent_status {
        Some(raw) => match ConsentStatus::parse(raw) {
            Some(s) => Some(s),
            None => {
                errors.push(FieldError::new("consentStatus", "unknown consent status"));
                None
            }
        },
        None => None,
    };

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        errors.push(FieldError::new(
            "limit",
            format!("must be between 1 and {}", MAX_LIMIT),
        ));
    }

    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        errors.push(FieldError::new("offset", "must not be negative"));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ConsentFilter {
        user_id: query.user_id.clone(),
        session_id: query.session_id.clone(),
        consent_type,
        consent_status,
        start_date: query.start_date,
        end_date: query.end_date,
        limit: Some(limit),
        offset: Some(offset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> ConsentRequest {
        ConsentRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            consent_type: ConsentType::Marketing,
            consent_status: ConsentStatus::Granted,
            ip_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            purpose: "Targeted advertising".to_string(),
            data_categories: vec!["behavioral".to_string()],
            processing_activities: vec!["advertising".to_string()],
            third_party_sharing: true,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(validate_consent_request(&valid_request()).is_empty());
    }

    #[test]
    fn test_invalid_ip_rejected() {
        let mut req = valid_request();
        req.ip_address = "not-an-ip".to_string();
        let errors = validate_consent_request(&req);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "ipAddress");
    }

    #[test]
    fn test_ipv6_accepted() {
        let mut req = valid_request();
        req.ip_address = "2001:db8::1".to_string();
        assert!(validate_consent_request(&req).is_empty());
    }

    #[test]
    fn test_empty_and_oversized_strings_rejected() {
        let mut req = valid_request();
        req.user_id = String::new();
        req.purpose = "x".repeat(501);
        req.user_agent = "y".repeat(1001);
        let errors = validate_consent_request(&req);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"userId"));
        assert!(fields.contains(&"purpose"));
        assert!(fields.contains(&"userAgent"));
    }

    #[test]
    fn test_empty_collections_rejected() {
        let mut req = valid_request();
        req.data_categories.clear();
        req.processing_activities.clear();
        let errors = validate_consent_request(&req);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_logs_query_defaults() {
        let filter = validate_logs_query(&LogsQuery::default()).unwrap();
        assert_eq!(filter.limit, Some(50));
        assert_eq!(filter.offset, Some(0));
        assert!(filter.user_id.is_none());
    }

    #[test]
    fn test_logs_query_bounds() {
        let query = LogsQuery {
            limit: Some(0),
            offset: Some(-1),
            ..Default::default()
        };
        let errors = validate_logs_query(&query).unwrap_err();
        assert_eq!(errors.len(), 2);

        let query = LogsQuery {
            limit: Some(1001),
            ..Default::default()
        };
        assert!(validate_logs_query(&query).is_err());
    }

    #[test]
    fn test_logs_query_unknown_enums_rejected() {
        let query = LogsQuery {
            consent_type: Some("biometric".to_string()),
            consent_status: Some("approved".to_string()),
            ..Default::default()
        };
        let errors = validate_logs_query(&query).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_logs_query_passes_through_filters() {
        let query = LogsQuery {
            user_id: Some("alice".to_string()),
            consent_type: Some("analytics".to_string()),
            consent_status: Some("granted".to_string()),
            limit: Some(10),
            offset: Some(20),
            ..Default::default()
        };
        let filter = validate_logs_query(&query).unwrap();
        assert_eq!(filter.user_id.as_deref(), Some("alice"));
        assert_eq!(filter.consent_type, Some(ConsentType::Analytics));
        assert_eq!(filter.consent_status, Some(ConsentStatus::Granted));
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, Some(20));
    }
}
