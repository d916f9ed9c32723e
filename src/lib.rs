//! Command-line client for identity-platform tenants.
//!
//! Authenticates an operator against a tenant with either the
//! client-credentials or the device-authorization grant, keeps the resulting
//! session in a tenant registry (token in the OS keyring when available), and
//! issues management-API calls with it.
//!
//! # Quick Start
//!
//! ```no_run
//! use is_cli::auth::SessionGuard;
//! use is_cli::config::Settings;
//!
//! # async fn example() -> Result<(), is_cli::error::CliError> {
//! let settings = Settings::from_env().with_keyring(false);
//! let registry = settings.load_registry()?;
//! let session = SessionGuard::new(&registry, &is_cli::auth::DisabledStore, settings.skew_margin)
//!     .ensure_authenticated(None)?;
//! let apps = session.management_client(&settings.issuer).list_applications().await?;
//! println!("{} applications", apps.total_results);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
