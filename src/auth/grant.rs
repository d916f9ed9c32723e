//! Token-endpoint protocol for the client-credentials and device-authorization grants.

use std::future::Future;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::device_code::DeviceFlowState;
use super::error::AuthError;
use super::token::GrantResult;

pub const DEFAULT_ISSUER: &str = "https://api.asgardeo.io";
pub const DEFAULT_DEVICE_CLIENT_ID: &str = "Wkwv5_jmo2DJVoul3bW7qve46C4a";
pub const DEFAULT_DEVICE_REALM: &str = "carbon.super";
pub const SYSTEM_SCOPE: &str = "SYSTEM";
const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Public client used for the device-authorization grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceClient {
    pub client_id: String,
    pub realm: String,
}

impl Default for DeviceClient {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_DEVICE_CLIENT_ID.to_string(),
            realm: DEFAULT_DEVICE_REALM.to_string(),
        }
    }
}

/// Inputs of a client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("tenant", &self.tenant)
            .finish()
    }
}

/// Issues token requests against the identity provider.
///
/// No UI and no storage: results are returned to the caller untouched.
///
/// # Example
/// ```no_run
/// use is_cli::auth::{ClientCredentials, GrantNegotiator};
///
/// # async fn example() -> Result<(), is_cli::auth::AuthError> {
/// let negotiator = GrantNegotiator::new("https://api.asgardeo.io");
/// let result = negotiator
///     .client_credentials_grant(&ClientCredentials {
///         client_id: "abc".to_string(),
///         client_secret: "xyz".to_string(),
///         tenant: "acme".to_string(),
///     })
///     .await?;
/// println!("expires in {}s", result.expires_in);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GrantNegotiator {
    client: reqwest::Client,
    issuer: String,
    device_client: DeviceClient,
    cancel: CancellationToken,
}

impl GrantNegotiator {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuer: issuer.into(),
            device_client: DeviceClient::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_device_client(mut self, device_client: DeviceClient) -> Self {
        self.device_client = device_client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = reqwest::Client::builder().timeout(timeout).build() {
            self.client = client;
        }
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Requests in flight resolve to [`AuthError::Canceled`] once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn client_credentials_grant(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<GrantResult, AuthError> {
        let url = self.endpoint(&credentials.tenant, "token")?;
        let basic = STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ));
        debug!(
            tenant = %credentials.tenant,
            client_id = %credentials.client_id,
            "Requesting client-credentials token"
        );
        let request = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Basic {basic}"))
            .form(&[("grant_type", "client_credentials"), ("scope", SYSTEM_SCOPE)]);
        self.cancellable(async move {
            let resp = request.send().await?;
            match resp.status() {
                status if status.is_success() => Ok(resp.json::<GrantResult>().await?),
                StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
                StatusCode::NOT_FOUND => Err(AuthError::TenantNotFound),
                status => Err(AuthError::Failed(describe_failure(
                    "Token request",
                    status,
                    &read_error_body(resp).await,
                ))),
            }
        })
        .await
    }

    pub async fn start_device_flow(&self) -> Result<DeviceFlowState, AuthError> {
        let url = self.endpoint(&self.device_client.realm, "device_authorize")?;
        debug!(realm = %self.device_client.realm, "Requesting device authorization");
        let request = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .form(&[("client_id", self.device_client.client_id.as_str())]);
        self.cancellable(async move {
            let resp = request.send().await?;
            if resp.status() != StatusCode::OK {
                let status = resp.status();
                return Err(AuthError::Failed(describe_failure(
                    "Device authorization request",
                    status,
                    &read_error_body(resp).await,
                )));
            }
            let mut state: DeviceFlowState = resp.json().await?;
            state.issued_at = Utc::now();
            Ok(state)
        })
        .await
    }

    /// Performs exactly one device-code exchange. Pacing belongs to the caller.
    pub async fn poll_device_flow(
        &self,
        state: &DeviceFlowState,
    ) -> Result<GrantResult, AuthError> {
        if state.is_expired_at(Utc::now()) {
            return Err(AuthError::DeviceCodeExpired);
        }
        let url = self.endpoint(&self.device_client.realm, "token")?;
        debug!(realm = %self.device_client.realm, "Exchanging device code");
        let request = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("client_id", self.device_client.client_id.as_str()),
                ("device_code", state.device_code.as_str()),
                ("scope", SYSTEM_SCOPE),
            ]);
        self.cancellable(async move {
            let resp = request.send().await?;
            if resp.status() == StatusCode::OK {
                return Ok(resp.json::<GrantResult>().await?);
            }
            let status = resp.status();
            let body = read_error_body(resp).await;
            match body.error.as_deref() {
                Some("authorization_pending") | Some("slow_down") => {
                    Err(AuthError::AuthorizationPending)
                }
                Some("expired_token") => Err(AuthError::DeviceCodeExpired),
                Some("access_denied") => Err(AuthError::Failed("Access denied".to_string())),
                _ => Err(AuthError::Failed(describe_failure(
                    "Device token request",
                    status,
                    &body,
                ))),
            }
        })
        .await
    }

    fn endpoint(&self, tenant: &str, operation: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.issuer).map_err(|err| {
            AuthError::Failed(format!("Invalid issuer URL {}: {err}", self.issuer))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AuthError::Failed(format!("Issuer URL {} cannot be a base", self.issuer))
            })?
            .pop_if_empty()
            .extend(["t", tenant, "oauth2", operation]);
        Ok(url)
    }

    /// Race a whole exchange, body included, against cancellation.
    async fn cancellable<T>(
        &self,
        exchange: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AuthError::Canceled),
            result = exchange => result,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

async fn read_error_body(resp: Response) -> OAuthErrorBody {
    match resp.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
        Err(_) => OAuthErrorBody::default(),
    }
}

fn describe_failure(what: &str, status: StatusCode, body: &OAuthErrorBody) -> String {
    match (&body.error, &body.error_description) {
        (_, Some(description)) => format!("{what} failed with status {status}: {description}"),
        (Some(code), None) => format!("{what} failed with status {status}: {code}"),
        (None, None) => format!("{what} failed with status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_tenant_path() {
        let negotiator = GrantNegotiator::new("https://idp.example.com");
        let url = negotiator.endpoint("acme", "token").unwrap();
        assert_eq!(url.as_str(), "https://idp.example.com/t/acme/oauth2/token");
    }

    #[test]
    fn endpoint_keeps_issuer_path_prefix() {
        let negotiator = GrantNegotiator::new("https://idp.example.com/base/");
        let url = negotiator.endpoint("acme", "device_authorize").unwrap();
        assert_eq!(
            url.as_str(),
            "https://idp.example.com/base/t/acme/oauth2/device_authorize"
        );
    }

    #[test]
    fn endpoint_escapes_tenant_segment() {
        let negotiator = GrantNegotiator::new("https://idp.example.com");
        let url = negotiator.endpoint("a/b", "token").unwrap();
        assert_eq!(url.as_str(), "https://idp.example.com/t/a%2Fb/oauth2/token");
    }

    #[test]
    fn invalid_issuer_is_reported() {
        let negotiator = GrantNegotiator::new("not a url");
        assert!(matches!(
            negotiator.endpoint("acme", "token"),
            Err(AuthError::Failed(_))
        ));
    }

    #[test]
    fn client_credentials_debug_hides_secret() {
        let creds = ClientCredentials {
            client_id: "abc".into(),
            client_secret: "hunter2".into(),
            tenant: "acme".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn describe_failure_prefers_description() {
        let body = OAuthErrorBody {
            error: Some("invalid_request".into()),
            error_description: Some("bad scope".into()),
        };
        let text = describe_failure("Token request", StatusCode::BAD_REQUEST, &body);
        assert!(text.contains("bad scope"));
        assert!(text.contains("400"));
    }
}
