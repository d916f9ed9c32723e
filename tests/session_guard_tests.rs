mod auth_support;

use chrono::{DateTime, Duration, Utc};
use is_cli::auth::{DisabledStore, GuardError, SessionGuard, TokenStatus};
use is_cli::config::{Tenant, TenantRegistry, CONFIG_FILE_NAME};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use auth_support::InMemoryCredentialStore;

fn tenant(name: &str, access_token: &str, expires_at: DateTime<Utc>) -> Tenant {
    Tenant {
        name: name.to_string(),
        client_id: "abc".to_string(),
        access_token: access_token.to_string(),
        refresh_token: None,
        expires_at,
    }
}

fn registry(dir: &TempDir, tenants: Vec<Tenant>) -> TenantRegistry {
    let mut registry = TenantRegistry::load(dir.path().join(CONFIG_FILE_NAME)).unwrap();
    for t in tenants {
        registry.upsert(t).unwrap();
    }
    registry
}

#[test]
fn ten_minutes_left_is_fresh_one_minute_is_stale() {
    let now = Utc::now();
    let dir = TempDir::new().unwrap();
    let registry = registry(
        &dir,
        vec![
            tenant("acme", "a", now + Duration::minutes(10)),
            tenant("globex", "g", now + Duration::minutes(1)),
        ],
    );
    let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));

    let session = guard
        .ensure_authenticated_at(Some("acme"), now)
        .expect("fresh session");
    assert_eq!(session.bearer_token, "a");

    let err = guard
        .ensure_authenticated_at(Some("globex"), now)
        .unwrap_err();
    assert!(matches!(err, GuardError::TokenExpired { tenant } if tenant == "globex"));
}

#[test]
fn credential_store_wins_over_embedded_token() {
    let now = Utc::now();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, vec![tenant("acme", "embedded", now + Duration::hours(1))]);
    let store = InMemoryCredentialStore::new();
    store.seed("acme", "from-store");

    let session = SessionGuard::new(&registry, &store, Duration::minutes(5))
        .ensure_authenticated_at(None, now)
        .unwrap();
    assert_eq!(session.bearer_token, "from-store");
    assert_eq!(session.tenant_name(), "acme");
}

#[test]
fn fresh_record_without_any_token_is_missing() {
    let now = Utc::now();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, vec![tenant("acme", "", now + Duration::hours(1))]);
    let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));

    assert_eq!(
        guard.token_status(registry.get("acme").unwrap(), now),
        TokenStatus::Absent
    );
    let err = guard.ensure_authenticated_at(None, now).unwrap_err();
    assert!(matches!(err, GuardError::TokenMissing { tenant } if tenant == "acme"));
}

#[test]
fn expired_check_happens_before_token_lookup() {
    let now = Utc::now();
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, vec![tenant("acme", "", now - Duration::minutes(1))]);
    let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));

    let err = guard.ensure_authenticated_at(None, now).unwrap_err();
    assert!(matches!(err, GuardError::TokenExpired { .. }));
}

#[test]
fn empty_registry_is_not_logged_in() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, vec![]);
    let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));

    let err = guard.ensure_authenticated(None).unwrap_err();
    assert!(matches!(err, GuardError::NotLoggedIn(_)));
}

#[test]
fn dangling_default_is_not_logged_in() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        serde_json::json!({
            "default_tenant": "gone",
            "tenants": {
                "acme": {
                    "name": "acme",
                    "client_id": "abc",
                    "access_token": "t",
                    "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339()
                }
            }
        })
        .to_string(),
    )
    .unwrap();
    let registry = TenantRegistry::load(&path).unwrap();
    let guard = SessionGuard::new(&registry, &DisabledStore, Duration::minutes(5));

    let err = guard.ensure_authenticated(Some("acme")).unwrap_err();
    assert!(matches!(err, GuardError::NotLoggedIn(reason) if reason.contains("default")));
}
