//! Command-line surface of `is`.

pub mod auth;
pub mod errors;
pub mod prompt;
pub mod resources;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::{
    BrowserLauncher, CredentialStore, DisabledStore, GrantNegotiator, KeyringStore, SystemBrowser,
};
use crate::config::Settings;
use crate::error::CliError;

/// Identity Server management CLI
#[derive(Parser, Debug)]
#[command(name = "is", version, about = "Manage identity-platform tenants from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate against a tenant
    Login(LoginArgs),
    /// Forget a tenant and its stored token
    Logout(LogoutArgs),
    /// Show every known tenant and its token state
    Status,
    /// Tenant selection
    Tenants(TenantsArgs),
    /// Manage applications
    #[command(visible_alias = "apps")]
    Applications(ApplicationsArgs),
    /// Manage API resources
    #[command(name = "api-resources", visible_alias = "apis")]
    ApiResources(ApiResourcesArgs),
}

/// Arguments for `is login`. Either all three flags or none.
#[derive(Args, Default)]
pub struct LoginArgs {
    /// Client ID of the machine-to-machine application
    #[arg(long, requires_all = ["client_secret", "tenant"])]
    pub client_id: Option<String>,
    /// Client secret of the machine-to-machine application
    #[arg(long, requires_all = ["client_id", "tenant"])]
    pub client_secret: Option<String>,
    /// Tenant domain
    #[arg(long, requires_all = ["client_id", "client_secret"])]
    pub tenant: Option<String>,
}

impl std::fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginArgs")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| ".."))
            .field("tenant", &self.tenant)
            .finish()
    }
}

impl LoginArgs {
    pub fn credentials(&self) -> Option<crate::auth::ClientCredentials> {
        Some(crate::auth::ClientCredentials {
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            tenant: self.tenant.clone()?,
        })
    }
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Tenant domain to log out from
    #[arg(long)]
    pub tenant: String,
}

#[derive(Args, Debug)]
pub struct TenantsArgs {
    #[command(subcommand)]
    pub command: TenantsCommands,
}

#[derive(Subcommand, Debug)]
pub enum TenantsCommands {
    /// Make a tenant the default for later commands
    Use {
        /// Tenant domain
        name: String,
    },
}

/// Tenant override shared by authenticated command groups.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
    /// Tenant to act on instead of the default one
    #[arg(long, global = true)]
    pub tenant: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplicationsArgs {
    #[command(flatten)]
    pub session: SessionArgs,
    #[command(subcommand)]
    pub command: ApplicationsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ApplicationsCommands {
    /// List applications
    List,
    /// Create an application
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Application template to start from
        #[arg(long)]
        template_id: Option<String>,
    },
    /// Delete an application
    Delete {
        /// Application ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct ApiResourcesArgs {
    #[command(flatten)]
    pub session: SessionArgs,
    #[command(subcommand)]
    pub command: ApiResourcesCommands,
}

#[derive(Subcommand, Debug)]
pub enum ApiResourcesCommands {
    /// List API resources
    List {
        /// Only resources of this type (e.g. BUSINESS, SYSTEM)
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Show one API resource with its properties
    Get {
        /// API resource ID
        id: String,
    },
    /// Register an API resource
    Create {
        #[arg(long)]
        name: String,
        /// Resource identifier, usually the API's base URL
        #[arg(long)]
        identifier: String,
        #[arg(long)]
        requires_authorization: bool,
    },
    /// Delete an API resource
    Delete {
        /// API resource ID
        id: String,
    },
}

/// Long-lived collaborators shared by every command.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub store: Arc<dyn CredentialStore>,
    pub browser: Arc<dyn BrowserLauncher>,
    pub cancel: CancellationToken,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        let store: Arc<dyn CredentialStore> = if settings.use_keyring {
            Arc::new(KeyringStore::new_default())
        } else {
            Arc::new(DisabledStore)
        };
        Self {
            settings,
            store,
            browser: Arc::new(SystemBrowser),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn negotiator(&self) -> GrantNegotiator {
        GrantNegotiator::new(&self.settings.issuer)
            .with_device_client(self.settings.device_client.clone())
            .with_timeout(self.settings.http_timeout)
            .with_cancellation(self.cancel.clone())
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Dispatch one parsed command.
pub async fn execute(cli: Cli, ctx: &AppContext) -> Result<(), CliError> {
    debug!(command = ?cli.command, "Executing command");
    match cli.command {
        Commands::Login(args) => auth::handle_login(&args, ctx).await,
        Commands::Logout(args) => auth::handle_logout(&args.tenant, ctx),
        Commands::Status => auth::handle_status(ctx),
        Commands::Tenants(args) => match args.command {
            TenantsCommands::Use { name } => auth::handle_use(&name, ctx),
        },
        Commands::Applications(args) => resources::handle_applications(args, ctx).await,
        Commands::ApiResources(args) => resources::handle_api_resources(args, ctx).await,
    }
}

/// Run a command and report failures. Returns the process exit code.
pub async fn run(cli: Cli, ctx: &AppContext) -> i32 {
    match execute(cli, ctx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", errors::format_error_help(&err));
            err.exit_code()
        }
    }
}
