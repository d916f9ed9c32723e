#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use is_cli::auth::{
    BrowserLauncher, CredentialStore, DeviceFlowState, Field, FlowStep, GrantKind, PromptError,
    Prompter, StoreError,
};
use is_cli::config::Settings;
use serde_json::{json, Value};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, tenant: &str, token: &str) {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(tenant.to_string(), token.to_string());
    }

    pub fn get(&self, tenant: &str) -> Option<String> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(tenant)
            .cloned()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn store(&self, tenant: &str, token: &str) -> Result<(), StoreError> {
        self.seed(tenant, token);
        Ok(())
    }

    fn retrieve(&self, tenant: &str) -> Option<String> {
        self.get(tenant)
    }

    fn delete(&self, tenant: &str) -> Result<(), StoreError> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .remove(tenant);
        Ok(())
    }
}

/// Store whose writes always fail, like a locked or missing keyring.
#[derive(Default)]
pub struct FailingCredentialStore {
    pub deletes: Mutex<Vec<String>>,
}

impl CredentialStore for FailingCredentialStore {
    fn store(&self, _tenant: &str, _token: &str) -> Result<(), StoreError> {
        Err(StoreError::AccessFailed("keyring locked".to_string()))
    }

    fn retrieve(&self, _tenant: &str) -> Option<String> {
        None
    }

    fn delete(&self, tenant: &str) -> Result<(), StoreError> {
        self.deletes
            .lock()
            .expect("store lock poisoned")
            .push(tenant.to_string());
        Err(StoreError::AccessFailed("keyring locked".to_string()))
    }
}

/// Prompter fed from a script; records everything shown to the operator.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub grant: Option<GrantKind>,
    pub answers: VecDeque<String>,
    pub confirmations: usize,
    pub asked: Vec<Field>,
    pub rejected: Vec<Field>,
    pub device_codes: Vec<(String, bool)>,
    pub progress: Vec<String>,
    pub confirm_calls: usize,
}

impl ScriptedPrompter {
    pub fn new(grant: GrantKind, answers: &[&str]) -> Self {
        Self {
            grant: Some(grant),
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn choose_grant(&mut self) -> Result<GrantKind, PromptError> {
        self.grant.ok_or(PromptError::Interrupted)
    }

    fn ask(&mut self, step: &FlowStep, _answered: &[FlowStep]) -> Result<String, PromptError> {
        self.asked.push(step.field);
        self.answers.pop_front().ok_or(PromptError::Interrupted)
    }

    fn invalid_input(&mut self, step: &FlowStep) {
        self.rejected.push(step.field);
    }

    fn show_device_code(&mut self, device: &DeviceFlowState, browser_opened: bool) {
        self.device_codes
            .push((device.user_code.clone(), browser_opened));
    }

    fn confirm_browser_login(&mut self) -> Result<(), PromptError> {
        self.confirm_calls += 1;
        if self.confirmations == 0 {
            return Err(PromptError::Declined);
        }
        self.confirmations -= 1;
        Ok(())
    }

    fn progress(&mut self, message: &str) {
        self.progress.push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingBrowser {
    pub fail: bool,
    pub opened: Mutex<Vec<String>>,
}

impl RecordingBrowser {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(url.to_string());
        if self.fail {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no browser available",
            ));
        }
        Ok(())
    }
}

pub fn grant_body(access_token: &str) -> Value {
    json!({
        "token_type": "Bearer",
        "access_token": access_token,
        "expires_in": 3600
    })
}

pub fn device_body() -> Value {
    json!({
        "device_code": "device-123",
        "user_code": "WDJB-MJHT",
        "verification_uri": "https://idp.example.com/device",
        "verification_uri_complete": "https://idp.example.com/device?user_code=WDJB-MJHT",
        "expires_in": 600,
        "interval": 5
    })
}

/// Settings pointing at a stub issuer and a temporary config directory.
pub fn settings_for(issuer: &str, config_dir: &Path) -> Settings {
    Settings::default()
        .with_issuer(issuer)
        .with_config_dir(config_dir)
        .with_keyring(false)
}
