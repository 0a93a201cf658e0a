use addedat_models::ItemType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::credentials::CredentialStore;

pub const ENV_BASE_URL: &str = "PLEX_BASE_URL";
pub const ENV_TOKEN: &str = "PLEX_TOKEN";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub plex: PlexConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct PlexConfig {
    /// Server URL, e.g. `http://host:32400`
    #[serde(default)]
    pub base_url: String,
}

/// Defaults applied when the corresponding CLI flag is absent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// 0 = unlimited
    #[serde(default)]
    pub max_per_minute: f64,
    #[serde(default)]
    pub sleep_seconds: f64,
    #[serde(default = "default_true")]
    pub lock: bool,
    #[serde(default = "default_movie_section")]
    pub movie_section: String,
    #[serde(default = "default_show_section")]
    pub show_section: String,
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    200
}

fn default_movie_section() -> String {
    ItemType::Movie.default_section().to_string()
}

fn default_show_section() -> String {
    ItemType::Show.default_section().to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_per_minute: 0.0,
            sleep_seconds: 0.0,
            lock: default_true(),
            movie_section: default_movie_section(),
            show_section: default_show_section(),
        }
    }
}

impl DefaultsConfig {
    pub fn section_for(&self, item_type: ItemType) -> &str {
        match item_type {
            ItemType::Movie => &self.movie_section,
            ItemType::Show => &self.show_section,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.defaults.page_size == 0 {
            return Err(anyhow::anyhow!("defaults.page_size must be greater than zero"));
        }
        if !(self.defaults.max_per_minute >= 0.0) {
            return Err(anyhow::anyhow!("defaults.max_per_minute must be non-negative"));
        }
        if !(self.defaults.sleep_seconds >= 0.0) {
            return Err(anyhow::anyhow!("defaults.sleep_seconds must be non-negative"));
        }
        let url = self.plex.base_url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow::anyhow!("plex.base_url must start with http:// or https://"));
        }
        Ok(())
    }
}

/// Server URL and token resolved from flags, environment and stored config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexConnection {
    pub base_url: String,
    pub token: String,
}

impl PlexConnection {
    /// Precedence: explicit flag, then environment, then config/credentials.
    /// Returns `None` when either the URL or the token is missing.
    pub fn resolve(
        flag_url: Option<&str>,
        flag_token: Option<&str>,
        config: &Config,
        credentials: &CredentialStore,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<Self> {
        let base_url = pick(flag_url, env(ENV_BASE_URL), Some(config.plex.base_url.as_str()))?;
        let token = pick(
            flag_token,
            env(ENV_TOKEN),
            credentials.get_plex_token().map(String::as_str),
        )?;

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_process_env(
        flag_url: Option<&str>,
        flag_token: Option<&str>,
        config: &Config,
        credentials: &CredentialStore,
    ) -> Option<Self> {
        Self::resolve(flag_url, flag_token, config, credentials, |key| std::env::var(key).ok())
    }
}

fn pick(flag: Option<&str>, env: Option<String>, stored: Option<&str>) -> Option<String> {
    flag.map(str::to_string)
        .or(env)
        .or_else(|| stored.map(str::to_string))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.plex.base_url = "http://plex.local:32400".to_string();
        config.defaults.max_per_minute = 30.0;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.plex.base_url, "http://plex.local:32400");
        assert_eq!(loaded.defaults.max_per_minute, 30.0);
        assert_eq!(loaded.defaults.page_size, 200);
        assert!(loaded.defaults.lock);
    }

    #[test]
    fn test_rate_cap_accepts_integers_and_fractions() {
        let config: Config = toml::from_str("[defaults]\nmax_per_minute = 30\n").unwrap();
        assert_eq!(config.defaults.max_per_minute, 30.0);

        let mut config: Config = toml::from_str("[defaults]\nmax_per_minute = 0.5\n").unwrap();
        assert_eq!(config.defaults.max_per_minute, 0.5);
        assert!(config.validate().is_ok());

        config.defaults.max_per_minute = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[plex]\nbase_url = \"http://x:32400\"\n").unwrap();
        assert_eq!(config.defaults.movie_section, "1");
        assert_eq!(config.defaults.section_for(ItemType::Show), "2");
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.defaults.page_size = 0;
        assert!(config.validate().is_err());

        config.defaults.page_size = 50;
        config.plex.base_url = "plex.local".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_precedence() {
        let mut config = Config::default();
        config.plex.base_url = "http://stored:32400/".to_string();
        let mut creds = CredentialStore::new(PathBuf::from("/tmp/unused"));
        creds.set_plex_token("stored-token".to_string());

        let conn = PlexConnection::resolve(None, None, &config, &creds, no_env).unwrap();
        assert_eq!(conn.base_url, "http://stored:32400");
        assert_eq!(conn.token, "stored-token");

        let env = |key: &str| match key {
            ENV_BASE_URL => Some("http://env:32400".to_string()),
            ENV_TOKEN => Some("env-token".to_string()),
            _ => None,
        };
        let conn = PlexConnection::resolve(None, None, &config, &creds, env).unwrap();
        assert_eq!(conn.base_url, "http://env:32400");
        assert_eq!(conn.token, "env-token");

        let conn = PlexConnection::resolve(Some("http://flag:1"), Some("flag-token"), &config, &creds, env).unwrap();
        assert_eq!(conn.base_url, "http://flag:1");
        assert_eq!(conn.token, "flag-token");
    }

    #[test]
    fn test_connection_missing_token() {
        let mut config = Config::default();
        config.plex.base_url = "http://stored:32400".to_string();
        let creds = CredentialStore::new(PathBuf::from("/tmp/unused"));
        assert!(PlexConnection::resolve(None, None, &config, &creds, no_env).is_none());
    }
}
