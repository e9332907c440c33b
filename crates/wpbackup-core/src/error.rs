use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("File not found: {}", path.display())]
    WpConfigNotFound { path: PathBuf },

    #[error("Unable to read {}: {source}", path.display())]
    WpConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error, {} seems to be corrupt: {key} not found", path.display())]
    CorruptWpConfig { path: PathBuf, key: &'static str },

    #[error("Failed to start dump utility '{program}': {source}")]
    DumpSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dump utility failed ({status}): {stderr}")]
    DumpFailed { status: ExitStatus, stderr: String },

    #[error("Invalid site path: {}", path.display())]
    InvalidSitePath { path: PathBuf },

    #[error("Storage {operation} failed: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("{0}")]
    Custom(String),

    #[error("Failed to walk directory: {0}")]
    WalkDir(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
