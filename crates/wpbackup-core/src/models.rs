use std::fmt;
use std::path::PathBuf;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Connection parameters read from a site's `wp-config.php`.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// One configured WordPress installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJob {
    pub site: PathBuf,
}

impl BackupJob {
    pub fn new(site: impl Into<PathBuf>) -> Self {
        Self { site: site.into() }
    }
}

/// A dated archive found in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub name: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteReport {
    pub site: PathBuf,
    #[serde(flatten)]
    pub status: SiteStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SiteStatus {
    Uploaded { archive: String, pruned: Vec<String> },
    Planned { archive: String, would_prune: Vec<String> },
    Skipped { reason: String },
}
