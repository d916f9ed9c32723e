//! User-facing error messages.

use crate::auth::{AuthError, GuardError, LoginError};
use crate::config::RegistryError;
use crate::error::CliError;
use crate::management::ApiError;

/// Map a [`CliError`] to a one-line message with actionable guidance.
pub fn format_error_help(err: &CliError) -> String {
    match err {
        CliError::Guard(GuardError::NotFound(name)) => {
            format!("Tenant {name} is not known. Run: is status to list known tenants")
        }
        CliError::Guard(GuardError::TokenMissing { tenant }) => format!(
            "No access token found for tenant {tenant}. The OS keyring entry may have been \
             cleared (Linux kernel keyrings do not survive a reboot). Run: is login"
        ),
        CliError::Guard(guard) if guard.needs_login() => format!("{guard}. Run: is login"),
        CliError::Registry(RegistryError::NotFound(name)) => {
            format!("Tenant not found: {name}. Run: is status to list known tenants")
        }
        CliError::Login(LoginError::Auth(AuthError::InvalidCredentials)) => {
            "Invalid client credentials. Check the client ID and secret of the application"
                .to_string()
        }
        CliError::Api(ApiError::Unauthorized { tenant }) => {
            format!("Access token rejected for tenant {tenant}. Run: is login")
        }
        CliError::Api(ApiError::Status {
            description: Some(description),
            ..
        }) => format!("{err} ({description})"),
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_logged_in_includes_login_hint() {
        let err = CliError::from(GuardError::NotLoggedIn("no tenants".into()));
        assert!(format_error_help(&err).contains("is login"));
    }

    #[test]
    fn expired_token_names_tenant() {
        let err = CliError::from(GuardError::TokenExpired {
            tenant: "acme".into(),
        });
        let help = format_error_help(&err);
        assert!(help.contains("acme"));
        assert!(help.contains("is login"));
    }

    #[test]
    fn missing_token_explains_keyring_loss() {
        let err = CliError::from(GuardError::TokenMissing {
            tenant: "acme".into(),
        });
        let help = format_error_help(&err);
        assert!(help.contains("acme"));
        assert!(help.contains("reboot"));
        assert!(help.ends_with("Run: is login"));
    }

    #[test]
    fn unknown_tenant_points_at_status() {
        let err = CliError::from(GuardError::NotFound("ghost".into()));
        let help = format_error_help(&err);
        assert!(help.contains("is status"));
        assert!(!help.contains("is login"));
    }

    #[test]
    fn blank_login_flag_is_invalid_argument() {
        let err = CliError::InvalidArgument("--tenant must not be blank".into());
        assert_eq!(
            format_error_help(&err),
            "Invalid argument: --tenant must not be blank"
        );
    }

    #[test]
    fn api_status_appends_description() {
        let err = CliError::from(ApiError::Status {
            status: 409,
            code: Some("APP-60007".into()),
            message: "Application already exists".into(),
            description: Some("An application named Billing exists".into()),
        });
        let help = format_error_help(&err);
        assert!(help.contains("409"));
        assert!(help.contains("named Billing"));
    }

    #[test]
    fn other_errors_fall_through_to_display() {
        let err = CliError::InvalidArgument("bad flag".into());
        assert_eq!(format_error_help(&err), "Invalid argument: bad flag");
    }
}
