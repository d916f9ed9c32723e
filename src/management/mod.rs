//! Bearer-authenticated client for the tenant management API.
//!
//! Every call goes to `{issuer}/t/{tenant}/api/server/v1/...` with the token the
//! session guard approved. Resource-specific calls live in [`applications`] and
//! [`api_resources`].

pub mod api_resources;
pub mod applications;

pub use api_resources::{ApiResource, ApiResourceList, NewApiResource, Property};
pub use applications::{Application, ApplicationList, NewApplication};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const API_BASE_SEGMENTS: [&str; 3] = ["api", "server", "v1"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Access token rejected for tenant {tenant}")]
    Unauthorized { tenant: String },
    #[error("API request failed with status {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
        description: Option<String>,
    },
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Canceled")]
    Canceled,
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Error document returned by the management API.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManagementClient {
    client: reqwest::Client,
    issuer: String,
    tenant: String,
    token: String,
    cancel: CancellationToken,
}

impl ManagementClient {
    pub fn new(issuer: &str, tenant: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuer: issuer.to_string(),
            tenant: tenant.to_string(),
            token: token.to_string(),
            cancel: CancellationToken::new(),
        }
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

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Resolve `segments` below the management base path, escaping each one.
    pub fn uri(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.issuer)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", self.issuer)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{} cannot be a base", self.issuer)))?
            .pop_if_empty()
            .extend(["t", self.tenant.as_str()])
            .extend(API_BASE_SEGMENTS)
            .extend(segments);
        Ok(url)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, tenant = %self.tenant, "Management API request");
        self.client.request(method, url).headers(self.headers())
    }

    /// Send and reject non-2xx responses.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let resp = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Canceled),
            resp = request.send() => resp?,
        };
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(self.status_error(resp).await)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.send(request).await?;
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    /// Send a create request and return the new resource id.
    pub(crate) async fn send_create(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<String>, ApiError> {
        let resp = self.send(request).await?;
        Ok(created_id(&resp))
    }

    async fn status_error(&self, resp: Response) -> ApiError {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized {
                tenant: self.tenant.clone(),
            };
        }
        let body: ErrorBody = match resp.text().await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => ErrorBody::default(),
        };
        warn!(status = status.as_u16(), code = ?body.code, "Management API error");
        ApiError::Status {
            status: status.as_u16(),
            code: body.code,
            message: body.message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            }),
            description: body.description,
        }
    }
}

/// Last path segment of the `Location` header.
fn created_id(resp: &Response) -> Option<String> {
    let location = resp.headers().get(LOCATION)?.to_str().ok()?;
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_builds_management_path() {
        let client = ManagementClient::new("https://api.asgardeo.io", "acme", "tok");
        let url = client.uri(&["applications"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.asgardeo.io/t/acme/api/server/v1/applications"
        );
    }

    #[test]
    fn uri_escapes_each_segment() {
        let client = ManagementClient::new("http://localhost:9443/", "acme", "tok");
        let url = client.uri(&["api-resources", "a/b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9443/t/acme/api/server/v1/api-resources/a%2Fb"
        );
    }

    #[test]
    fn invalid_issuer_is_rejected() {
        let client = ManagementClient::new("::nope", "acme", "tok");
        assert!(matches!(client.uri(&[]), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn headers_carry_bearer_token() {
        let client = ManagementClient::new("https://api.asgardeo.io", "acme", "tok");
        let headers = client.headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }
}
