//! Login state machine.
//!
//! [`LoginFlow`] owns everything one login attempt needs and knows nothing
//! about terminals or HTTP. A driver asks [`LoginFlow::next_action`] what to do,
//! performs it, and reports the result back through the transition methods.

use strum::{Display, EnumString};
use thiserror::Error;

use super::device_code::DeviceFlowState;
use super::grant::ClientCredentials;

/// Which OAuth2 grant the operator picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum GrantKind {
    /// Client credentials.
    Machine,
    /// Device authorization.
    User,
}

impl GrantKind {
    pub const ALL: [GrantKind; 2] = [GrantKind::Machine, GrantKind::User];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Machine => "As a machine",
            Self::User => "As a user",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Machine => "Authenticates the CLI as a machine using client credentials",
            Self::User => "Authenticates the CLI as a user through the browser",
        }
    }

    /// Ordered inputs collected for this grant.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Self::Machine => &[Field::Tenant, Field::ClientId, Field::ClientSecret],
            Self::User => &[Field::Tenant, Field::ClientId],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Secret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Tenant,
    ClientId,
    ClientSecret,
}

impl Field {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Tenant => "Tenant domain",
            Self::ClientId => "Client ID",
            Self::ClientSecret => "Client secret",
        }
    }

    pub fn input_kind(&self) -> InputKind {
        match self {
            Self::ClientSecret => InputKind::Secret,
            _ => InputKind::Text,
        }
    }
}

/// One interactive question and, once submitted, its answer.
#[derive(Clone, PartialEq, Eq)]
pub struct FlowStep {
    pub field: Field,
    pub prompt: &'static str,
    pub input: InputKind,
    answer: Option<String>,
}

impl FlowStep {
    fn new(field: Field) -> Self {
        Self {
            field,
            prompt: field.prompt(),
            input: field.input_kind(),
            answer: None,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }
}

impl std::fmt::Debug for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let answer = match (&self.answer, self.input) {
            (Some(_), InputKind::Secret) => Some(".."),
            (Some(answer), InputKind::Text) => Some(answer.as_str()),
            (None, _) => None,
        };
        f.debug_struct("FlowStep")
            .field("field", &self.field)
            .field("answer", &answer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    NotStarted,
    GrantChosen(GrantKind),
    CollectingInputs,
    ClientCredentialsInProgress,
    DeviceFlowStarted,
    DeviceFlowAwaitingUser,
    DeviceFlowExchanging,
    Completed,
    Failed(String),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowAction {
    ChooseGrant,
    CollectInputs,
    Prompt(FlowStep),
    RequestClientCredentials(ClientCredentials),
    StartDeviceFlow,
    OpenBrowser(DeviceFlowState),
    AwaitConfirmation(DeviceFlowState),
    ExchangeDeviceCode(DeviceFlowState),
    Finished,
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank answer; the same step is presented again.
    Rejected,
    Accepted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Cannot {action} while login is in state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: FlowState,
    },
    #[error("{} must not be blank", .field.prompt())]
    BlankInput { field: Field },
}

/// State of one login attempt. Discarded once the attempt ends.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    state: FlowState,
    grant: Option<GrantKind>,
    steps: Vec<FlowStep>,
    current: usize,
    device: Option<DeviceFlowState>,
    browser_opened: bool,
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::NotStarted,
            grant: None,
            steps: Vec::new(),
            current: 0,
            device: None,
            browser_opened: false,
        }
    }

    /// Skip straight to the client-credentials exchange with every input known.
    ///
    /// Answers go through [`LoginFlow::submit`], so they are normalized and
    /// validated exactly as typed answers are.
    pub fn non_interactive(credentials: ClientCredentials) -> Result<Self, FlowError> {
        let mut flow = Self::new();
        flow.choose_grant(GrantKind::Machine)?;
        flow.begin_inputs()?;
        for field in GrantKind::Machine.fields() {
            let answer = match field {
                Field::Tenant => &credentials.tenant,
                Field::ClientId => &credentials.client_id,
                Field::ClientSecret => &credentials.client_secret,
            };
            if flow.submit(answer)? == SubmitOutcome::Rejected {
                return Err(FlowError::BlankInput { field: *field });
            }
        }
        Ok(flow)
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn grant(&self) -> Option<GrantKind> {
        self.grant
    }

    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    /// Steps answered so far, in order.
    pub fn answered_steps(&self) -> &[FlowStep] {
        &self.steps[..self.current.min(self.steps.len())]
    }

    pub fn current_step(&self) -> Option<&FlowStep> {
        match self.state {
            FlowState::CollectingInputs => self.steps.get(self.current),
            _ => None,
        }
    }

    pub fn device_state(&self) -> Option<&DeviceFlowState> {
        self.device.as_ref()
    }

    pub fn browser_opened(&self) -> bool {
        self.browser_opened
    }

    pub fn answer(&self, field: Field) -> Option<&str> {
        self.steps
            .iter()
            .find(|step| step.field == field)
            .and_then(FlowStep::answer)
    }

    pub fn client_credentials(&self) -> Option<ClientCredentials> {
        Some(ClientCredentials {
            tenant: self.answer(Field::Tenant)?.to_string(),
            client_id: self.answer(Field::ClientId)?.to_string(),
            client_secret: self.answer(Field::ClientSecret)?.to_string(),
        })
    }

    pub fn next_action(&self) -> FlowAction {
        match &self.state {
            FlowState::NotStarted => FlowAction::ChooseGrant,
            FlowState::GrantChosen(_) => FlowAction::CollectInputs,
            FlowState::CollectingInputs => match self.steps.get(self.current) {
                Some(step) => FlowAction::Prompt(step.clone()),
                None => FlowAction::Aborted("no input left to collect".to_string()),
            },
            FlowState::ClientCredentialsInProgress => match self.client_credentials() {
                Some(credentials) => FlowAction::RequestClientCredentials(credentials),
                None => FlowAction::Aborted("client credentials are incomplete".to_string()),
            },
            FlowState::DeviceFlowStarted => match &self.device {
                None => FlowAction::StartDeviceFlow,
                Some(device) => FlowAction::OpenBrowser(device.clone()),
            },
            FlowState::DeviceFlowAwaitingUser => match &self.device {
                Some(device) => FlowAction::AwaitConfirmation(device.clone()),
                None => FlowAction::Aborted("device flow state missing".to_string()),
            },
            FlowState::DeviceFlowExchanging => match &self.device {
                Some(device) => FlowAction::ExchangeDeviceCode(device.clone()),
                None => FlowAction::Aborted("device flow state missing".to_string()),
            },
            FlowState::Completed => FlowAction::Finished,
            FlowState::Failed(reason) => FlowAction::Aborted(reason.clone()),
        }
    }

    pub fn choose_grant(&mut self, grant: GrantKind) -> Result<(), FlowError> {
        self.expect(matches!(self.state, FlowState::NotStarted), "choose a grant")?;
        self.grant = Some(grant);
        self.steps = grant.fields().iter().copied().map(FlowStep::new).collect();
        self.current = 0;
        self.state = FlowState::GrantChosen(grant);
        Ok(())
    }

    pub fn begin_inputs(&mut self) -> Result<(), FlowError> {
        self.expect(
            matches!(self.state, FlowState::GrantChosen(_)),
            "collect inputs",
        )?;
        self.state = FlowState::CollectingInputs;
        Ok(())
    }

    /// Submit an answer for the current step. Blank answers are rejected.
    ///
    /// Text answers are trimmed. Secrets are kept byte for byte.
    pub fn submit(&mut self, answer: &str) -> Result<SubmitOutcome, FlowError> {
        self.expect(
            matches!(self.state, FlowState::CollectingInputs),
            "submit an answer",
        )?;
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            return Ok(SubmitOutcome::Rejected);
        }
        if self.current >= self.steps.len() {
            return Err(self.invalid("submit an answer"));
        }
        let step = &mut self.steps[self.current];
        step.answer = Some(match step.input {
            InputKind::Secret => answer.to_string(),
            InputKind::Text => trimmed.to_string(),
        });
        self.current += 1;
        if self.current == self.steps.len() {
            self.state = match self.grant {
                Some(GrantKind::User) => FlowState::DeviceFlowStarted,
                _ => FlowState::ClientCredentialsInProgress,
            };
        }
        Ok(SubmitOutcome::Accepted)
    }

    pub fn device_code_received(&mut self, device: DeviceFlowState) -> Result<(), FlowError> {
        self.expect(
            matches!(self.state, FlowState::DeviceFlowStarted) && self.device.is_none(),
            "record a device code",
        )?;
        self.device = Some(device);
        Ok(())
    }

    /// Opening the browser is best effort; either way the flow waits for the operator.
    pub fn browser_result(&mut self, opened: bool) -> Result<(), FlowError> {
        self.expect(
            matches!(self.state, FlowState::DeviceFlowStarted) && self.device.is_some(),
            "record the browser result",
        )?;
        self.browser_opened = opened;
        self.state = FlowState::DeviceFlowAwaitingUser;
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), FlowError> {
        self.expect(
            matches!(self.state, FlowState::DeviceFlowAwaitingUser),
            "confirm the browser login",
        )?;
        self.state = FlowState::DeviceFlowExchanging;
        Ok(())
    }

    /// The server has not seen the browser approval yet; wait for another confirmation.
    pub fn exchange_pending(&mut self) -> Result<(), FlowError> {
        self.expect(
            matches!(self.state, FlowState::DeviceFlowExchanging),
            "return to waiting",
        )?;
        self.state = FlowState::DeviceFlowAwaitingUser;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), FlowError> {
        self.expect(
            matches!(
                self.state,
                FlowState::ClientCredentialsInProgress | FlowState::DeviceFlowExchanging
            ),
            "complete",
        )?;
        self.state = FlowState::Completed;
        self.device = None;
        Ok(())
    }

    /// Halt the attempt. Terminal states are left untouched.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.state.is_terminal() {
            self.state = FlowState::Failed(reason.into());
            self.device = None;
        }
    }

    fn expect(&self, allowed: bool, action: &'static str) -> Result<(), FlowError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            action,
            state: self.state.clone(),
        }
    }
}
