use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::browser::BrowserLauncher;
use super::device_code::DeviceFlowState;
use super::error::AuthError;
use super::flow::{Field, FlowAction, FlowError, FlowStep, GrantKind, LoginFlow, SubmitOutcome};
use super::grant::{ClientCredentials, GrantNegotiator};
use super::store::CredentialStore;
use super::token::GrantResult;
use crate::config::{RegistryError, Tenant, TenantRegistry};

/// Interaction seam used by the orchestrator.
///
/// All I/O decisions (rendering, key handling) belong to the implementation;
/// the orchestrator only asks questions and reports progress.
pub trait Prompter {
    fn choose_grant(&mut self) -> Result<GrantKind, PromptError>;
    /// Ask one question. `answered` holds the steps already completed.
    fn ask(&mut self, step: &FlowStep, answered: &[FlowStep]) -> Result<String, PromptError>;
    fn invalid_input(&mut self, step: &FlowStep);
    fn show_device_code(&mut self, device: &DeviceFlowState, browser_opened: bool);
    /// Blocks until the operator says the browser step is done.
    fn confirm_browser_login(&mut self) -> Result<(), PromptError>;
    fn progress(&mut self, message: &str);
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Input interrupted")]
    Interrupted,
    #[error("Login declined")]
    Declined,
    #[error("Interactive input unavailable")]
    Unavailable,
    #[error("Terminal error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PromptError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::Interrupted => Self::Interrupted,
            _ => Self::Io(error.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("Login aborted: {0}")]
    Aborted(String),
}

/// Where the bearer token ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLocation {
    SecretStore,
    ConfigFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub tenant: String,
    pub grant: GrantKind,
    pub expires_at: DateTime<Utc>,
    pub token_location: TokenLocation,
}

/// Drives a [`LoginFlow`] to completion and persists the result.
///
/// # Example
/// ```no_run
/// use is_cli::auth::{
///     ClientCredentials, DisabledStore, GrantNegotiator, LoginOrchestrator, SystemBrowser,
/// };
/// use is_cli::config::TenantRegistry;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let negotiator = GrantNegotiator::new("https://api.asgardeo.io");
/// let mut registry = TenantRegistry::load("/tmp/is-cli/config.json")?;
/// let outcome = LoginOrchestrator::new(&negotiator, &mut registry, &DisabledStore, &SystemBrowser)
///     .run_non_interactive(ClientCredentials {
///         client_id: "abc".to_string(),
///         client_secret: "xyz".to_string(),
///         tenant: "acme".to_string(),
///     })
///     .await?;
/// println!("logged in to {}", outcome.tenant);
/// # Ok(())
/// # }
/// ```
pub struct LoginOrchestrator<'a> {
    negotiator: &'a GrantNegotiator,
    registry: &'a mut TenantRegistry,
    store: &'a dyn CredentialStore,
    browser: &'a dyn BrowserLauncher,
}

impl<'a> LoginOrchestrator<'a> {
    pub fn new(
        negotiator: &'a GrantNegotiator,
        registry: &'a mut TenantRegistry,
        store: &'a dyn CredentialStore,
        browser: &'a dyn BrowserLauncher,
    ) -> Self {
        Self {
            negotiator,
            registry,
            store,
            browser,
        }
    }

    pub async fn run_interactive(
        &mut self,
        prompter: &mut dyn Prompter,
    ) -> Result<LoginOutcome, LoginError> {
        let mut flow = LoginFlow::new();
        self.drive(&mut flow, prompter).await
    }

    /// Fast path: all inputs known up front, no prompts.
    pub async fn run_non_interactive(
        &mut self,
        credentials: ClientCredentials,
    ) -> Result<LoginOutcome, LoginError> {
        let mut flow = LoginFlow::non_interactive(credentials)?;
        self.drive(&mut flow, &mut Unattended).await
    }

    /// Run `flow` until it reaches a terminal state.
    pub async fn drive(
        &mut self,
        flow: &mut LoginFlow,
        prompter: &mut dyn Prompter,
    ) -> Result<LoginOutcome, LoginError> {
        let mut outcome = None;
        loop {
            let action = flow.next_action();
            debug!(state = ?flow.state(), "Login flow step");
            match action {
                FlowAction::ChooseGrant => {
                    let chosen = prompter.choose_grant();
                    let grant = record_failure(flow, chosen)?;
                    flow.choose_grant(grant)?;
                }
                FlowAction::CollectInputs => flow.begin_inputs()?,
                FlowAction::Prompt(step) => {
                    let asked = prompter.ask(&step, flow.answered_steps());
                    let answer = record_failure(flow, asked)?;
                    if flow.submit(&answer)? == SubmitOutcome::Rejected {
                        prompter.invalid_input(&step);
                    }
                }
                FlowAction::RequestClientCredentials(credentials) => {
                    prompter.progress("Authenticating as a machine...");
                    let issued_at = Utc::now();
                    let granted = self.negotiator.client_credentials_grant(&credentials).await;
                    let result = record_failure(flow, granted)?;
                    let persisted = self.persist_grant(
                        &credentials.tenant,
                        &credentials.client_id,
                        GrantKind::Machine,
                        result,
                        issued_at,
                    );
                    outcome = Some(record_failure(flow, persisted)?);
                    flow.complete()?;
                }
                FlowAction::StartDeviceFlow => {
                    prompter.progress("Requesting a device code...");
                    let started = self.negotiator.start_device_flow().await;
                    let device = record_failure(flow, started)?;
                    flow.device_code_received(device)?;
                }
                FlowAction::OpenBrowser(device) => {
                    let opened = match self.browser.open(device.browser_uri()) {
                        Ok(()) => true,
                        Err(err) => {
                            warn!(error = %err, "Could not open browser");
                            false
                        }
                    };
                    flow.browser_result(opened)?;
                    prompter.show_device_code(&device, opened);
                }
                FlowAction::AwaitConfirmation(_) => {
                    let confirmed = prompter.confirm_browser_login();
                    record_failure(flow, confirmed)?;
                    flow.confirm()?;
                }
                FlowAction::ExchangeDeviceCode(device) => {
                    let issued_at = Utc::now();
                    match self.negotiator.poll_device_flow(&device).await {
                        Ok(result) => {
                            let (tenant, client_id) = device_identity(flow);
                            let persisted = self.persist_grant(
                                &tenant,
                                &client_id,
                                GrantKind::User,
                                result,
                                issued_at,
                            );
                            outcome = Some(record_failure(flow, persisted)?);
                            flow.complete()?;
                        }
                        Err(AuthError::AuthorizationPending) => {
                            flow.exchange_pending()?;
                            prompter.progress(PENDING_MESSAGE);
                        }
                        Err(err) => {
                            flow.fail(err.to_string());
                            return Err(err.into());
                        }
                    }
                }
                FlowAction::Finished => {
                    return outcome.ok_or_else(|| {
                        LoginError::Aborted("login finished without a result".to_string())
                    });
                }
                FlowAction::Aborted(reason) => return Err(LoginError::Aborted(reason)),
            }
        }
    }

    /// Turn a grant into a tenant record and write it through store and registry.
    ///
    /// The token goes to the credential store when possible and is embedded in
    /// the record otherwise.
    pub fn persist_grant(
        &mut self,
        tenant_name: &str,
        client_id: &str,
        grant: GrantKind,
        result: GrantResult,
        issued_at: DateTime<Utc>,
    ) -> Result<LoginOutcome, RegistryError> {
        let expires_at = result.expires_at(issued_at);
        let mut tenant = Tenant {
            name: tenant_name.to_string(),
            client_id: client_id.to_string(),
            access_token: String::new(),
            refresh_token: result.refresh_token,
            expires_at,
        };

        let token_location = match self.store.store(tenant_name, &result.access_token) {
            Ok(()) => TokenLocation::SecretStore,
            Err(err) => {
                warn!(
                    tenant = %tenant_name,
                    error = %err,
                    "Secret store unavailable, keeping token in config file"
                );
                // A stale entry would shadow the embedded token.
                let _ = self.store.delete(tenant_name);
                tenant.access_token = result.access_token;
                TokenLocation::ConfigFile
            }
        };

        self.registry.upsert_as_default(tenant)?;
        info!(tenant = %tenant_name, %grant, ?token_location, "Login completed");
        Ok(LoginOutcome {
            tenant: tenant_name.to_string(),
            grant,
            expires_at,
            token_location,
        })
    }
}

const PENDING_MESSAGE: &str =
    "Authorization is still pending. Finish the browser step, then confirm again.";

/// Record a failure in the flow before handing the error back.
fn record_failure<T, E>(flow: &mut LoginFlow, result: Result<T, E>) -> Result<T, LoginError>
where
    E: Into<LoginError> + std::fmt::Display,
{
    result.map_err(|err| {
        flow.fail(err.to_string());
        err.into()
    })
}

fn device_identity(flow: &LoginFlow) -> (String, String) {
    (
        flow.answer(Field::Tenant).unwrap_or_default().to_string(),
        flow.answer(Field::ClientId).unwrap_or_default().to_string(),
    )
}

/// Prompter for the non-interactive path: asks nothing, reports nothing.
struct Unattended;

impl Prompter for Unattended {
    fn choose_grant(&mut self) -> Result<GrantKind, PromptError> {
        Err(PromptError::Unavailable)
    }

    fn ask(&mut self, _step: &FlowStep, _answered: &[FlowStep]) -> Result<String, PromptError> {
        Err(PromptError::Unavailable)
    }

    fn invalid_input(&mut self, _step: &FlowStep) {}

    fn show_device_code(&mut self, _device: &DeviceFlowState, _browser_opened: bool) {}

    fn confirm_browser_login(&mut self) -> Result<(), PromptError> {
        Err(PromptError::Unavailable)
    }

    fn progress(&mut self, message: &str) {
        debug!("{message}");
    }
}
