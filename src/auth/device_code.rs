use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// In-progress device authorization.
///
/// Created by [`GrantNegotiator::start_device_flow`](super::GrantNegotiator::start_device_flow)
/// and consumed by the follow-up exchange.
///
/// # Example
/// ```no_run
/// use is_cli::auth::DeviceFlowState;
/// use chrono::Utc;
///
/// let state = DeviceFlowState {
///     device_code: "device-code".to_string(),
///     user_code: "ABCD-EFGH".to_string(),
///     verification_uri: "https://api.asgardeo.io/t/carbon.super/device".to_string(),
///     verification_uri_complete: "https://api.asgardeo.io/t/carbon.super/device?user_code=ABCD-EFGH".to_string(),
///     expires_in: 600,
///     interval: 5,
///     issued_at: Utc::now(),
/// };
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceFlowState {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(skip_deserializing, default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

impl DeviceFlowState {
    /// The URI to open for the operator, preferring the one that embeds the user code.
    pub fn browser_uri(&self) -> &str {
        if self.verification_uri_complete.is_empty() {
            &self.verification_uri
        } else {
            &self.verification_uri_complete
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

// device_code is a server-side secret.
impl std::fmt::Debug for DeviceFlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFlowState")
            .field("device_code", &"..")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("verification_uri_complete", &self.verification_uri_complete)
            .field("expires_in", &self.expires_in)
            .field("interval", &self.interval)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

fn default_interval() -> u64 {
    5
}
