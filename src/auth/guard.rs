//! Pre-flight session check for authenticated commands.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::error::GuardError;
use super::store::CredentialStore;
use crate::config::{RegistryError, Tenant, TenantRegistry};
use crate::management::ManagementClient;

/// Freshness of a tenant's token at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Fresh,
    Expired,
    /// Unexpired, but no bearer value in the store or the record.
    Absent,
}

impl TokenStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Expired => "expired",
            Self::Absent => "no token",
        }
    }
}

/// An approved tenant plus the bearer token to send.
#[derive(Clone)]
pub struct ActiveSession {
    pub tenant: Tenant,
    pub bearer_token: String,
}

impl ActiveSession {
    pub fn tenant_name(&self) -> &str {
        &self.tenant.name
    }

    pub fn management_client(&self, issuer: &str) -> ManagementClient {
        ManagementClient::new(issuer, &self.tenant.name, &self.bearer_token)
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("tenant", &self.tenant.name)
            .field("bearer_token", &"..")
            .finish()
    }
}

pub struct SessionGuard<'a> {
    registry: &'a TenantRegistry,
    store: &'a dyn CredentialStore,
    skew_margin: Duration,
}

impl<'a> SessionGuard<'a> {
    pub fn new(
        registry: &'a TenantRegistry,
        store: &'a dyn CredentialStore,
        skew_margin: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            skew_margin,
        }
    }

    /// Stale once `now + skew_margin` reaches the expiry.
    pub fn is_stale(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match now.checked_add_signed(self.skew_margin) {
            Some(deadline) => deadline >= expires_at,
            None => true,
        }
    }

    /// Credential store first, then the token embedded in the record.
    pub fn resolve_token(&self, tenant: &Tenant) -> Option<String> {
        if let Some(token) = self.store.retrieve(&tenant.name).filter(|t| !t.is_empty()) {
            return Some(token);
        }
        tenant
            .has_embedded_token()
            .then(|| tenant.access_token.clone())
    }

    pub fn token_status(&self, tenant: &Tenant, now: DateTime<Utc>) -> TokenStatus {
        if self.is_stale(tenant.expires_at, now) {
            TokenStatus::Expired
        } else if self.resolve_token(tenant).is_some() {
            TokenStatus::Fresh
        } else {
            TokenStatus::Absent
        }
    }

    pub fn ensure_authenticated(&self, tenant: Option<&str>) -> Result<ActiveSession, GuardError> {
        self.ensure_authenticated_at(tenant, Utc::now())
    }

    pub fn ensure_authenticated_at(
        &self,
        tenant: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ActiveSession, GuardError> {
        self.registry.validate().map_err(guard_error)?;
        let name = match tenant.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => self
                .registry
                .default_tenant()
                .ok_or_else(|| guard_error(RegistryError::NoDefault))?,
        };
        let record = self.registry.get(name).map_err(guard_error)?;

        if self.is_stale(record.expires_at, now) {
            debug!(tenant = %name, expires_at = %record.expires_at, "Token stale");
            return Err(GuardError::TokenExpired {
                tenant: name.to_string(),
            });
        }
        let bearer_token = self
            .resolve_token(record)
            .ok_or_else(|| GuardError::TokenMissing {
                tenant: name.to_string(),
            })?;
        debug!(tenant = %name, "Session approved");
        Ok(ActiveSession {
            tenant: record.clone(),
            bearer_token,
        })
    }
}

fn guard_error(err: RegistryError) -> GuardError {
    match err {
        RegistryError::NotFound(name) => GuardError::NotFound(name),
        RegistryError::EmptyRegistry => {
            GuardError::NotLoggedIn("no tenants configured".to_string())
        }
        RegistryError::NoDefault => GuardError::NotLoggedIn("no default tenant set".to_string()),
        other => GuardError::NotLoggedIn(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::DisabledStore;
    use crate::config::CONFIG_FILE_NAME;
    use tempfile::TempDir;

    fn tenant(name: &str, token: &str, expires_at: DateTime<Utc>) -> Tenant {
        Tenant {
            name: name.into(),
            client_id: "abc".into(),
            access_token: token.into(),
            refresh_token: None,
            expires_at,
        }
    }

    fn registry_with(dir: &TempDir, tenants: Vec<Tenant>) -> TenantRegistry {
        let mut registry = TenantRegistry::load(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        for t in tenants {
            registry.upsert(t).unwrap();
        }
        registry
    }

    #[test]
    fn skew_margin_decides_freshness() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(&dir, vec![]);
        let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));
        let now = Utc::now();
        assert!(!guard.is_stale(now + Duration::minutes(10), now));
        assert!(guard.is_stale(now + Duration::minutes(1), now));
        assert!(guard.is_stale(now + Duration::minutes(5), now));
    }

    #[test]
    fn three_explicit_outcomes() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(&dir, vec![]);
        let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));
        let now = Utc::now();
        let later = now + Duration::hours(1);

        assert_eq!(guard.token_status(&tenant("a", "tok", later), now), TokenStatus::Fresh);
        assert_eq!(
            guard.token_status(&tenant("a", "tok", now), now),
            TokenStatus::Expired
        );
        assert_eq!(guard.token_status(&tenant("a", "", later), now), TokenStatus::Absent);
    }

    #[test]
    fn explicit_tenant_overrides_default() {
        let dir = TempDir::new().unwrap();
        let later = Utc::now() + Duration::hours(1);
        let registry = registry_with(
            &dir,
            vec![tenant("acme", "a-token", later), tenant("globex", "g-token", later)],
        );
        let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));

        let session = guard.ensure_authenticated(None).unwrap();
        assert_eq!(session.tenant_name(), "acme");
        let session = guard.ensure_authenticated(Some("globex")).unwrap();
        assert_eq!(session.bearer_token, "g-token");
    }

    #[test]
    fn unknown_tenant_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(
            &dir,
            vec![tenant("acme", "t", Utc::now() + Duration::hours(1))],
        );
        let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));
        let err = guard.ensure_authenticated(Some("initech")).unwrap_err();
        assert!(matches!(err, GuardError::NotFound(name) if name == "initech"));
    }

    #[test]
    fn empty_registry_is_not_logged_in() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(&dir, vec![]);
        let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));
        let err = guard.ensure_authenticated(None).unwrap_err();
        assert!(matches!(err, GuardError::NotLoggedIn(_)));
        assert!(err.needs_login());
    }

    #[test]
    fn debug_hides_bearer_token() {
        let session = ActiveSession {
            tenant: tenant("acme", "secret-token", Utc::now()),
            bearer_token: "secret-token".into(),
        };
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
