//! Handlers for login, logout, status and tenant selection.

use chrono::Utc;
use tracing::warn;

use super::prompt::TerminalPrompter;
use super::{AppContext, LoginArgs};
use crate::auth::{
    ClientCredentials, CredentialStore, LoginOrchestrator, LoginOutcome, SessionGuard, StoreError,
    TokenLocation,
};
use crate::config::TenantRegistry;
use crate::error::CliError;

/// Handle `is login`.
pub async fn handle_login(args: &LoginArgs, ctx: &AppContext) -> Result<(), CliError> {
    let credentials = args.credentials();
    if let Some(credentials) = &credentials {
        reject_blank_flags(credentials)?;
    }
    let mut registry = ctx.settings.load_registry()?;
    let negotiator = ctx.negotiator();
    let mut orchestrator = LoginOrchestrator::new(
        &negotiator,
        &mut registry,
        ctx.store.as_ref(),
        ctx.browser.as_ref(),
    );

    let outcome = match credentials {
        Some(credentials) => orchestrator.run_non_interactive(credentials).await?,
        None => {
            let mut prompter = TerminalPrompter::new();
            orchestrator.run_interactive(&mut prompter).await?
        }
    };
    print_login_outcome(&outcome);
    Ok(())
}

fn reject_blank_flags(credentials: &ClientCredentials) -> Result<(), CliError> {
    let flags = [
        ("--tenant", &credentials.tenant),
        ("--client-id", &credentials.client_id),
        ("--client-secret", &credentials.client_secret),
    ];
    match flags.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((flag, _)) => Err(CliError::InvalidArgument(format!("{flag} must not be blank"))),
        None => Ok(()),
    }
}

fn print_login_outcome(outcome: &LoginOutcome) {
    println!(
        "Logged in to tenant {} ({})",
        outcome.tenant,
        outcome.grant.label().to_lowercase()
    );
    println!(
        "Token expires at {}",
        outcome.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    if outcome.token_location == TokenLocation::ConfigFile {
        println!("OS keyring unavailable: token saved in the config file instead");
    }
}

/// Handle `is logout --tenant <name>`.
pub fn handle_logout(tenant: &str, ctx: &AppContext) -> Result<(), CliError> {
    let mut registry = ctx.settings.load_registry()?;
    logout_tenant(&mut registry, ctx.store.as_ref(), tenant)?;
    println!("Logged out from tenant {tenant}");
    Ok(())
}

/// The registry entry goes first so a tenant is never left half-present in
/// the config file. A failed config write stops before the secret is touched.
pub fn logout_tenant(
    registry: &mut TenantRegistry,
    store: &dyn CredentialStore,
    tenant: &str,
) -> Result<(), CliError> {
    registry.remove(tenant)?;
    match store.delete(tenant) {
        Ok(()) => Ok(()),
        // Nothing can have been stored in a store that does not exist.
        Err(StoreError::Unavailable(reason)) => {
            warn!(%tenant, %reason, "Secret store unavailable during logout");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Handle `is status`.
pub fn handle_status(ctx: &AppContext) -> Result<(), CliError> {
    let registry = ctx.settings.load_registry()?;
    if registry.is_empty() {
        println!("Not logged in to any tenant. Run: is login");
        return Ok(());
    }

    let guard = SessionGuard::new(&registry, ctx.store.as_ref(), ctx.settings.skew_margin);
    let now = Utc::now();
    let default = registry.default_tenant();
    for tenant in registry.list() {
        let marker = if Some(tenant.name.as_str()) == default { "*" } else { " " };
        let status = guard.token_status(tenant, now);
        println!(
            "{marker} {:<24} {:<10} client {}  expires {}",
            tenant.name,
            status.label(),
            tenant.client_id,
            tenant.expires_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(())
}

/// Handle `is tenants use <name>`.
pub fn handle_use(name: &str, ctx: &AppContext) -> Result<(), CliError> {
    let mut registry = ctx.settings.load_registry()?;
    registry.set_default(name)?;
    println!("Default tenant set to {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DisabledStore;
    use crate::config::{RegistryError, Tenant, CONFIG_FILE_NAME};
    use chrono::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn credentials(tenant: &str, client_id: &str, client_secret: &str) -> ClientCredentials {
        ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant: tenant.into(),
        }
    }

    #[test]
    fn blank_flags_are_invalid_arguments() {
        let err = reject_blank_flags(&credentials(" ", "abc", "xyz")).unwrap_err();
        assert!(matches!(
            &err,
            CliError::InvalidArgument(msg) if msg == "--tenant must not be blank"
        ));
        assert_eq!(err.exit_code(), 1);

        let err = reject_blank_flags(&credentials("acme", "abc", "")).unwrap_err();
        assert!(matches!(
            err,
            CliError::InvalidArgument(msg) if msg.starts_with("--client-secret")
        ));

        assert!(reject_blank_flags(&credentials("acme", "abc", " xyz ")).is_ok());
    }

    #[test]
    fn logout_fails_when_config_cannot_be_written() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("config");
        let mut registry = TenantRegistry::load(config_dir.join(CONFIG_FILE_NAME)).unwrap();
        registry
            .upsert(Tenant {
                name: "acme".into(),
                client_id: "abc".into(),
                access_token: "t".into(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            })
            .unwrap();

        fs::rename(&config_dir, dir.path().join("moved")).unwrap();
        fs::write(&config_dir, "file, not a directory").unwrap();

        let err = logout_tenant(&mut registry, &DisabledStore, "acme").unwrap_err();
        assert!(matches!(
            err,
            CliError::Registry(RegistryError::PersistFailure { .. })
        ));
        assert_eq!(err.exit_code(), 1);
        assert!(registry.get("acme").is_ok());
    }
}
