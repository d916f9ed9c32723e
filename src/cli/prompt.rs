//! Terminal prompter backed by `dialoguer`.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

use crate::auth::{DeviceFlowState, FlowStep, GrantKind, InputKind, PromptError, Prompter};

impl From<dialoguer::Error> for PromptError {
    fn from(error: dialoguer::Error) -> Self {
        match error {
            dialoguer::Error::IO(err) => err.into(),
        }
    }
}

pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn choose_grant(&mut self) -> Result<GrantKind, PromptError> {
        let items: Vec<String> = GrantKind::ALL
            .iter()
            .map(|kind| format!("{} - {}", kind.label(), kind.description()))
            .collect();
        let selected = Select::with_theme(&self.theme)
            .with_prompt("How do you want to authenticate?")
            .items(&items)
            .default(0)
            .interact()?;
        GrantKind::ALL
            .get(selected)
            .copied()
            .ok_or(PromptError::Interrupted)
    }

    fn ask(&mut self, step: &FlowStep, _answered: &[FlowStep]) -> Result<String, PromptError> {
        let answer = match step.input {
            InputKind::Text => Input::<String>::with_theme(&self.theme)
                .with_prompt(step.prompt)
                .allow_empty(true)
                .interact_text()?,
            InputKind::Secret => Password::with_theme(&self.theme)
                .with_prompt(step.prompt)
                .allow_empty_password(true)
                .interact()?,
        };
        Ok(answer)
    }

    fn invalid_input(&mut self, step: &FlowStep) {
        eprintln!("{} cannot be empty", step.prompt);
    }

    fn show_device_code(&mut self, device: &DeviceFlowState, browser_opened: bool) {
        println!();
        println!("Your one-time code: {}", device.user_code);
        if browser_opened {
            println!("A browser window has been opened at {}", device.browser_uri());
        } else {
            println!("Open {} in your browser to continue", device.browser_uri());
        }
        println!("The code expires in {} minutes", device.expires_in / 60);
    }

    fn confirm_browser_login(&mut self) -> Result<(), PromptError> {
        let done = Confirm::with_theme(&self.theme)
            .with_prompt("Have you approved the login in the browser?")
            .default(true)
            .interact()?;
        if done {
            Ok(())
        } else {
            Err(PromptError::Declined)
        }
    }

    fn progress(&mut self, message: &str) {
        eprintln!("{message}");
    }
}
