// UI layer: interactive credential setup using `dialoguer` prompts and an
// `indicatif` spinner while the login check runs.

use crate::api::ApiClient;
use crate::config::Config;
use anyhow::Result;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Prompt for credentials, verify them and save them to `config_path`.
/// Returns whether the credentials were saved.
pub fn setup_wizard(config_path: &Path) -> Result<bool> {
    let config = Config::load_from(config_path)?;
    println!("Config file: {}", config_path.display());

    let username: String = Input::new()
        .with_prompt("GENESIS username")
        .with_initial_text(config.genesis.username.clone())
        .interact_text()?;
    // `Password` hides input in terminal for passwords.
    let password: String = Password::new().with_prompt("GENESIS password").interact()?;

    let config = with_credentials(config, &username, &password);

    if !check_login(&config)? {
        let save_anyway = Confirm::new()
            .with_prompt("Save credentials anyway?")
            .default(false)
            .interact()?;
        if !save_anyway {
            println!("Credentials not saved.");
            return Ok(false);
        }
    }

    config.save_to(config_path)?;
    println!("Credentials saved to {}", config_path.display());
    Ok(true)
}

/// Run the API login check behind a spinner.
fn check_login(config: &Config) -> Result<bool> {
    let client = ApiClient::from_config(&config.genesis)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("Checking credentials...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = client.login_check();
    spinner.finish_and_clear();

    match result {
        Ok(msg) => {
            println!("Login check passed: {}", msg);
            Ok(true)
        }
        Err(e) => {
            println!("Login check failed: {:#}", e);
            Ok(false)
        }
    }
}

fn with_credentials(mut config: Config, username: &str, password: &str) -> Config {
    config.genesis.username = username.trim().to_string();
    config.genesis.password = password.to_string();
    config
}
