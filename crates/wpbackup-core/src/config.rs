use crate::error::{Error, Result};
use crate::retention::RetentionPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Scratch directory for dumps and archives. Removed at the end of every run.
    pub backup_dir: PathBuf,

    /// Name of the WordPress configuration file inside a site directory.
    pub wp_config_file: String,

    /// Program invoked to dump the database.
    pub dump_command: String,

    /// Maximum number of archives kept in the bucket.
    pub retention_limit: usize,

    /// How `retention_limit` is enforced.
    pub retention_policy: RetentionPolicy,

    /// Endpoint override for S3-compatible object stores.
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing (needed by most self-hosted stores).
    pub force_path_style: bool,

    /// Directory for a daily rolling log file, in addition to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("/tmp/wpbackup"),
            wp_config_file: "wp-config.php".to_string(),
            dump_command: "mysqldump".to_string(),
            retention_limit: 7,
            retention_policy: RetentionPolicy::default(),
            endpoint_url: None,
            force_path_style: false,
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wpbackup").map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Loads settings from the default config file (if any) and `WPBACKUP_*` variables.
    pub fn new() -> Result<Self> {
        Self::load(None)
    }

    /// Same as [`Settings::new`], but an explicit file replaces the default one and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match (explicit, Self::config_path()) {
            (Some(path), _) => builder.add_source(config::File::from(path).required(true)),
            (None, Some(path)) => builder.add_source(config::File::from(path).required(false)),
            (None, None) => builder,
        };

        let settings: Settings = builder
            .add_source(config::Environment::with_prefix("WPBACKUP").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_limit == 0 {
            return Err(Error::InvalidSetting(
                "retention_limit must be at least 1".to_string(),
            ));
        }
        if self.dump_command.trim().is_empty() {
            return Err(Error::InvalidSetting("dump_command is empty".to_string()));
        }
        if self.wp_config_file.trim().is_empty() {
            return Err(Error::InvalidSetting("wp_config_file is empty".to_string()));
        }
        Ok(())
    }
}
