//! Command-level error type.

use strum::Display;
use thiserror::Error;

use crate::auth::{AuthError, FlowError, GuardError, LoginError, PromptError, StoreError};
use crate::config::RegistryError;
use crate::management::ApiError;

/// Exit status used when the operator interrupts a command.
pub const EXIT_CANCELED: i32 = 130;
pub const EXIT_FAILURE: i32 = 1;

/// Coarse classification used for exit codes and help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorCategory {
    Authentication,
    Session,
    Storage,
    Network,
    Api,
    Input,
    Canceled,
}

/// Anything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Login(err) => match err {
                LoginError::Auth(err) => auth_category(err),
                LoginError::Registry(_) => ErrorCategory::Storage,
                LoginError::Prompt(err) => prompt_category(err),
                LoginError::Flow(FlowError::BlankInput { .. }) => ErrorCategory::Input,
                LoginError::Flow(_) | LoginError::Aborted(_) => ErrorCategory::Authentication,
            },
            Self::Guard(_) => ErrorCategory::Session,
            Self::Registry(RegistryError::EmptyRegistry | RegistryError::NoDefault) => {
                ErrorCategory::Session
            }
            Self::Registry(RegistryError::NotFound(_)) => ErrorCategory::Input,
            Self::Registry(_) | Self::Store(_) => ErrorCategory::Storage,
            Self::Api(err) => match err {
                ApiError::Unauthorized { .. } => ErrorCategory::Session,
                ApiError::Network(_) => ErrorCategory::Network,
                ApiError::Canceled => ErrorCategory::Canceled,
                _ => ErrorCategory::Api,
            },
            Self::Prompt(err) => prompt_category(err),
            Self::InvalidArgument(_) => ErrorCategory::Input,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.category() == ErrorCategory::Canceled
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_canceled() {
            EXIT_CANCELED
        } else {
            EXIT_FAILURE
        }
    }
}

fn auth_category(err: &AuthError) -> ErrorCategory {
    match err {
        AuthError::Network(_) => ErrorCategory::Network,
        AuthError::Canceled => ErrorCategory::Canceled,
        _ => ErrorCategory::Authentication,
    }
}

fn prompt_category(err: &PromptError) -> ErrorCategory {
    match err {
        PromptError::Interrupted => ErrorCategory::Canceled,
        _ => ErrorCategory::Input,
    }
}
