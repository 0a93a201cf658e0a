pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, DefaultsConfig, PlexConfig, PlexConnection, ENV_BASE_URL, ENV_TOKEN};
pub use credentials::CredentialStore;
pub use paths::{PathManager, base_path_override};
