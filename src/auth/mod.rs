//! Grant negotiation, login orchestration and session checks.

pub mod browser;
pub mod device_code;
pub mod error;
pub mod flow;
pub mod grant;
pub mod guard;
pub mod service;
pub mod store;
pub mod token;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use device_code::DeviceFlowState;
pub use error::{AuthError, GuardError, StoreError};
pub use flow::{
    Field, FlowAction, FlowError, FlowState, FlowStep, GrantKind, InputKind, LoginFlow,
};
pub use grant::{ClientCredentials, DeviceClient, GrantNegotiator};
pub use guard::{ActiveSession, SessionGuard, TokenStatus};
pub use service::{
    LoginError, LoginOrchestrator, LoginOutcome, PromptError, Prompter, TokenLocation,
};
pub use store::{CredentialStore, DisabledStore, KeyringStore};
pub use token::GrantResult;
