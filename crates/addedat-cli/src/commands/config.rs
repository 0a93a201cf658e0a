use super::prompts;
use super::Workspace;
use crate::output::{mask_secret, new_table, Output};
use addedat_config::{Config, CredentialStore, PathManager, ENV_BASE_URL, ENV_TOKEN};
use addedat_sources::PlexClient;
use clap::{ArgAction, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show current configuration (masks the token)
    Show {
        /// Print the token unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Store the Plex server URL and token
    #[command(long_about = "Store the Plex server URL in config.toml and the token in credentials.toml. Values not given as flags are prompted for. The connection is checked by listing library sections unless --no-verify is set.")]
    Plex {
        /// Plex server URL, e.g. http://host:32400
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Plex token (prompted for when absent)
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,

        /// Skip the connection check
        #[arg(long, action = ArgAction::SetTrue)]
        no_verify: bool,
    },
}

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, output),
        ConfigCommands::Plex {
            base_url,
            token,
            no_verify,
        } => configure_plex(base_url, token, no_verify, output).await,
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let ws = Workspace::load()?;
    let config_file = ws.paths.config_file();
    let token = ws.credentials.get_plex_token().cloned().unwrap_or_default();
    let token_display = if full { token.clone() } else { mask_secret(&token) };
    let defaults = &ws.config.defaults;

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'addedat config plex' to create it. Built-in defaults are shown below.");
    }

    if output.is_human() && !output.is_quiet() {
        let mut files = new_table(vec!["Config File", &config_file.display().to_string()]);
        files.add_row(vec![
            "Credentials File".to_string(),
            ws.paths.credentials_file().display().to_string(),
        ]);
        files.add_row(vec!["Data Directory".to_string(), ws.paths.data_dir().display().to_string()]);
        output.table(&files);

        let mut plex = new_table(vec![]);
        plex.set_header(vec![Cell::new("Plex").fg(Color::Cyan).add_attribute(Attribute::Bold)]);
        plex.add_row(vec![
            Cell::new("Base URL"),
            Cell::new(if ws.config.plex.base_url.is_empty() {
                "<not set>".bright_black().to_string()
            } else {
                ws.config.plex.base_url.clone()
            }),
        ]);
        plex.add_row(vec![Cell::new("Token"), Cell::new(&token_display)]);
        plex.add_row(vec![
            Cell::new("Environment"),
            Cell::new(format!(
                "{} {} / {} {}",
                ENV_BASE_URL,
                env_marker(ENV_BASE_URL),
                ENV_TOKEN,
                env_marker(ENV_TOKEN)
            )),
        ]);
        output.table(&plex);

        let mut table = new_table(vec![]);
        table.set_header(vec![Cell::new("Defaults").fg(Color::Cyan).add_attribute(Attribute::Bold)]);
        table.add_row(vec!["Page size".to_string(), defaults.page_size.to_string()]);
        table.add_row(vec![
            "Max per minute".to_string(),
            if defaults.max_per_minute <= 0.0 {
                "unlimited".to_string()
            } else {
                defaults.max_per_minute.to_string()
            },
        ]);
        table.add_row(vec!["Sleep seconds".to_string(), format!("{:.2}", defaults.sleep_seconds)]);
        table.add_row(vec!["Lock added date".to_string(), defaults.lock.to_string()]);
        table.add_row(vec!["Movie section".to_string(), defaults.movie_section.clone()]);
        table.add_row(vec!["Show section".to_string(), defaults.show_section.clone()]);
        output.table(&table);
    }

    output.json(&json!({
        "config_file": config_file.display().to_string(),
        "plex": {
            "base_url": ws.config.plex.base_url,
            "token": token_display,
        },
        "defaults": {
            "page_size": defaults.page_size,
            "max_per_minute": defaults.max_per_minute,
            "sleep_seconds": defaults.sleep_seconds,
            "lock": defaults.lock,
            "movie_section": defaults.movie_section,
            "show_section": defaults.show_section,
        },
    }));
    Ok(())
}

fn env_marker(key: &str) -> String {
    if std::env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false) {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

async fn configure_plex(
    base_url_arg: Option<String>,
    token_arg: Option<String>,
    no_verify: bool,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    let mut config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

    let interactive = base_url_arg.is_none() || token_arg.is_none();

    let base_url = match base_url_arg {
        Some(url) => url,
        None => {
            let existing = Some(config.plex.base_url.as_str()).filter(|s| !s.is_empty());
            prompts::prompt_string("Plex server URL", existing.or(Some("http://localhost:32400")))?
        }
    };
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if base_url.is_empty() {
        return Err(eyre!("Plex server URL is required"));
    }

    let token = match token_arg {
        Some(t) => t,
        None => {
            let has_existing = cred_store.get_plex_token().is_some();
            prompts::prompt_secret("Plex token", !has_existing)?
        }
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(eyre!("Plex token is required"));
    }

    config.plex.base_url = base_url.clone();
    config
        .validate()
        .map_err(|e| eyre!("Invalid configuration: {}", e))?;

    if !no_verify {
        output.info("Verifying Plex connection...");
        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        spinner.set_message("Listing library sections...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        let result = match PlexClient::new(&base_url, &token) {
            Ok(client) => client.list_sections(None).await,
            Err(e) => Err(e),
        };
        spinner.finish_and_clear();

        match result {
            Ok(sections) => output.success(format!("Connected: {} library section(s)", sections.len())),
            Err(e) => {
                output.warn(format!("Could not reach Plex: {}", e));
                if interactive && !prompts::prompt_yes_no("Save anyway?", false)? {
                    return Err(eyre!("Plex connection check failed"));
                }
            }
        }
    }

    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    cred_store.set_plex_token(token);
    cred_store
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e))?;

    output.success("Plex configuration saved!");
    output.info(format!("  Server URL: {}", base_url));
    output.json(&json!({ "base_url": base_url, "saved": true }));
    Ok(())
}
