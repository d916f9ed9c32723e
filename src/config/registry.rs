//! Tenant registry persisted as a single JSON document.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tenant not found: {0}")]
    NotFound(String),
    #[error("Not logged in to any tenant. Run: is login")]
    EmptyRegistry,
    #[error("No default tenant set. Run: is tenants use <name>")]
    NoDefault,
    #[error("Failed to write config file {path}: {message}")]
    PersistFailure { path: PathBuf, message: String },
    #[error("Failed to read config file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// One authenticated backend context.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    pub client_id: String,
    /// Empty when the token lives in the credential store.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Tenant {
    pub fn has_embedded_token(&self) -> bool {
        !self.access_token.is_empty()
    }
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("access_token", &self.has_embedded_token().then_some(".."))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| ".."))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    default_tenant: String,
    #[serde(default)]
    tenants: HashMap<String, Tenant>,
}

/// Mapping of tenant name to [`Tenant`] with a distinguished default.
///
/// Every mutation is applied to a copy, written to disk, and only then
/// committed, so a failed write leaves memory and disk unchanged.
///
/// # Example
/// ```no_run
/// use is_cli::config::TenantRegistry;
///
/// let registry = TenantRegistry::load("/tmp/is-cli/config.json")?;
/// registry.validate()?;
/// # Ok::<(), is_cli::config::RegistryError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    path: PathBuf,
    state: RegistryFile,
}

impl TenantRegistry {
    /// Load the registry at `path`. A missing file yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| RegistryError::Corrupt {
                path: path.clone(),
                message: err.to_string(),
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RegistryFile::default(),
            Err(err) => {
                return Err(RegistryError::Corrupt {
                    path,
                    message: err.to_string(),
                })
            }
        };
        debug!(path = %path.display(), "Loaded tenant registry");
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_tenant(&self) -> Option<&str> {
        Some(self.state.default_tenant.as_str()).filter(|name| !name.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.state.tenants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.tenants.len()
    }

    pub fn get(&self, name: &str) -> Result<&Tenant, RegistryError> {
        self.state
            .tenants
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// All tenants ordered by name.
    pub fn list(&self) -> Vec<&Tenant> {
        let mut tenants: Vec<&Tenant> = self.state.tenants.values().collect();
        tenants.sort_by(|a, b| a.name.cmp(&b.name));
        tenants
    }

    /// Insert or overwrite by name. The first tenant becomes the default.
    pub fn upsert(&mut self, tenant: Tenant) -> Result<(), RegistryError> {
        let mut next = self.state.clone();
        if next.default_tenant.is_empty() {
            next.default_tenant = tenant.name.clone();
        }
        let name = tenant.name.clone();
        next.tenants.insert(name.clone(), tenant);
        self.commit(next)?;
        info!(tenant = %name, "Tenant saved");
        Ok(())
    }

    /// Insert or overwrite by name and make it the default, in one write.
    pub fn upsert_as_default(&mut self, tenant: Tenant) -> Result<(), RegistryError> {
        let mut next = self.state.clone();
        let name = tenant.name.clone();
        next.default_tenant = name.clone();
        next.tenants.insert(name.clone(), tenant);
        self.commit(next)?;
        info!(tenant = %name, "Tenant saved as default");
        Ok(())
    }

    /// Remove a tenant. When it was the default, an arbitrary remaining
    /// tenant is elected (map order), or the default is cleared.
    pub fn remove(&mut self, name: &str) -> Result<Tenant, RegistryError> {
        let mut next = self.state.clone();
        let removed = next
            .tenants
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if next.default_tenant == name {
            next.default_tenant = next.tenants.keys().next().cloned().unwrap_or_default();
        }
        self.commit(next)?;
        info!(tenant = %name, "Tenant removed");
        Ok(removed)
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.state.tenants.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        let mut next = self.state.clone();
        next.default_tenant = name.to_string();
        self.commit(next)?;
        info!(tenant = %name, "Default tenant changed");
        Ok(())
    }

    /// Gate for commands that need a session.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.state.tenants.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }
        if !self.state.tenants.contains_key(&self.state.default_tenant) {
            return Err(RegistryError::NoDefault);
        }
        Ok(())
    }

    fn commit(&mut self, next: RegistryFile) -> Result<(), RegistryError> {
        let serialized =
            serde_json::to_vec_pretty(&next).map_err(|err| self.persist_failure(err))?;
        atomic_write(&self.path, &serialized).map_err(|err| self.persist_failure(err))?;
        self.state = next;
        Ok(())
    }

    fn persist_failure(&self, err: impl std::fmt::Display) -> RegistryError {
        RegistryError::PersistFailure {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(0o700);
            builder.create(parent)?;
        }
    }

    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("config path {} has no file name", path.display()),
        )
    })?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_name = format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    Ok(())
}
