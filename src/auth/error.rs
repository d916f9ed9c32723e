use thiserror::Error;

/// Errors produced while negotiating a grant with the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid client credentials")]
    InvalidCredentials,
    #[error("Tenant not found")]
    TenantNotFound,
    #[error("Authorization pending: complete the browser step and confirm again")]
    AuthorizationPending,
    #[error("Device code expired, run the login command again")]
    DeviceCodeExpired,
    #[error("Authentication failed: {0}")]
    Failed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Canceled")]
    Canceled,
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

/// Failure of the OS secret store. Never fatal to a login.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),
    #[error("Secret store access failed: {0}")]
    AccessFailed(String),
}

impl From<keyring::Error> for StoreError {
    fn from(error: keyring::Error) -> Self {
        match error {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                Self::Unavailable(error.to_string())
            }
            other => Self::AccessFailed(other.to_string()),
        }
    }
}

/// Pre-flight failures raised by the session guard.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Not logged in: {0}")]
    NotLoggedIn(String),
    #[error("Access token for tenant {tenant} has expired")]
    TokenExpired { tenant: String },
    #[error("Tenant not found: {0}")]
    NotFound(String),
    #[error("No access token stored for tenant {tenant}")]
    TokenMissing { tenant: String },
}

impl GuardError {
    /// Whether running the login command again resolves this error.
    pub fn needs_login(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}
