use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token-endpoint response of a successful grant.
///
/// Never persisted as-is; the orchestrator turns it into a
/// [`Tenant`](crate::config::Tenant) before storage.
///
/// # Example
/// ```no_run
/// use is_cli::auth::GrantResult;
///
/// let result = GrantResult {
///     token_type: "Bearer".to_string(),
///     access_token: "access".to_string(),
///     refresh_token: None,
///     expires_in: 3600,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResult {
    #[serde(default)]
    pub token_type: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
}

impl GrantResult {
    /// Absolute expiry for a token issued at `issued_at`.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_at_adds_expires_in_to_issue_time() {
        let result = GrantResult {
            token_type: "Bearer".into(),
            access_token: "a".into(),
            refresh_token: None,
            expires_in: 3600,
        };
        let issued = Utc::now();
        assert_eq!(result.expires_at(issued), issued + Duration::hours(1));
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let result: GrantResult =
            serde_json::from_str(r#"{"access_token":"tok","expires_in":10}"#).unwrap();
        assert_eq!(result.access_token, "tok");
        assert!(result.token_type.is_empty());
        assert!(result.refresh_token.is_none());
    }
}
