use color_eyre::Result;
use dialoguer::{Confirm, Input, Password};

/// Prompt for a string value with an optional default.
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
    if let Some(default_value) = default {
        input = input.default(default_value.to_string());
    }
    input
        .interact_text()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Masked input. Asks twice when `confirm` is set.
pub fn prompt_secret(prompt: &str, confirm: bool) -> Result<String> {
    let mut password = Password::new().with_prompt(prompt);
    if confirm {
        password = password.with_confirmation(format!("Confirm {}", prompt), "Values do not match");
    }
    password
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read {}: {}", prompt, e))
}

pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}
