use tracing::debug;

use super::error::StoreError;

pub const DEFAULT_KEYRING_SERVICE: &str = "is-cli";

/// Secret storage for a tenant's bearer token.
///
/// All operations are best-effort: callers fall back to the plaintext tenant
/// record when `store` fails, and `retrieve` never errors for a missing entry.
pub trait CredentialStore: Send + Sync {
    fn store(&self, tenant: &str, token: &str) -> Result<(), StoreError>;
    fn retrieve(&self, tenant: &str) -> Option<String>;
    fn delete(&self, tenant: &str) -> Result<(), StoreError>;
}

/// OS keyring backed store (Keychain, Credential Manager, kernel keyutils).
///
/// On Linux the entries live in the kernel session keyring, which does not
/// survive a reboot. A tenant whose token was stored there then reports
/// "no token" and needs `is login` again. Set `IS_CLI_KEYRING=off` to keep
/// tokens in the config file instead.
///
/// # Example
/// ```no_run
/// use is_cli::auth::{CredentialStore, KeyringStore};
///
/// let store = KeyringStore::new_default();
/// if store.store("acme", "token").is_err() {
///     // keep the token in the tenant record instead
/// }
/// ```
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn new_default() -> Self {
        Self::new(DEFAULT_KEYRING_SERVICE)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, tenant: &str) -> Result<keyring::Entry, StoreError> {
        Ok(keyring::Entry::new(&self.service, tenant)?)
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, tenant: &str, token: &str) -> Result<(), StoreError> {
        self.entry(tenant)?.set_password(token)?;
        debug!(service = %self.service, tenant, "Token written to keyring");
        Ok(())
    }

    fn retrieve(&self, tenant: &str) -> Option<String> {
        let entry = self.entry(tenant).ok()?;
        match entry.get_password() {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(err) => {
                debug!(service = %self.service, tenant, error = %err, "Keyring read failed");
                None
            }
        }
    }

    fn delete(&self, tenant: &str) -> Result<(), StoreError> {
        match self.entry(tenant)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Store used when the keyring is switched off; tokens stay in the tenant record.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

impl CredentialStore for DisabledStore {
    fn store(&self, _tenant: &str, _token: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("keyring disabled".to_string()))
    }

    fn retrieve(&self, _tenant: &str) -> Option<String> {
        None
    }

    fn delete(&self, _tenant: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_store_refuses_writes() {
        let store = DisabledStore;
        assert!(matches!(
            store.store("acme", "token"),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn disabled_store_reads_nothing_and_deletes_cleanly() {
        let store = DisabledStore;
        assert!(store.retrieve("acme").is_none());
        store.delete("acme").unwrap();
    }

    #[test]
    fn keyring_store_uses_default_service() {
        assert_eq!(KeyringStore::new_default().service(), "is-cli");
        assert_eq!(KeyringStore::new("custom").service(), "custom");
    }
}
