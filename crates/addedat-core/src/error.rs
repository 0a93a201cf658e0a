use addedat_sources::SourceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invalid target at position {index}: {reason}")]
    InvalidTarget { index: usize, reason: String },

    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("{date} has no representable local time")]
    NonexistentLocalTime { date: chrono::NaiveDate },

    #[error("selection file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("selection file {}: {source}", path.display())]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
