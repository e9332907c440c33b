pub mod archive;
pub mod config;
pub mod dump;
pub mod error;
pub mod models;
pub mod retention;
#[cfg(feature = "s3")]
pub mod s3;
pub mod storage;
pub mod wp_config;

// Publicly re-export the main types for a clean external API.
pub use config::Settings;
pub use error::{Error, Result};
pub use models::{ArchiveRecord, BackupJob, DatabaseCredentials, SiteReport, SiteStatus};
pub use retention::{RetentionManager, RetentionPolicy};
#[cfg(feature = "s3")]
pub use s3::{S3Options, S3Store};
pub use storage::ObjectStore;

use chrono::Utc;
use dump::DumpRunner;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, span, warn, Level};

/// Backs up WordPress sites into an [`ObjectStore`], one site after another.
#[derive(Debug)]
pub struct WpBackup<S> {
    settings: Settings,
    store: S,
}

impl<S: ObjectStore> WpBackup<S> {
    pub fn new(settings: Settings, store: S) -> Self {
        Self { settings, store }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Processes every job in order. The first failure aborts the run.
    /// Dumps and archives live in a per-run directory inside `backup_dir`
    /// that is removed whatever the outcome; `backup_dir` itself is only
    /// removed when this run created it.
    #[instrument(skip(self, jobs), name = "backup_run", fields(dry_run = %dry_run, sites = jobs.len()))]
    pub fn run(&self, jobs: &[BackupJob], dry_run: bool) -> Result<Vec<SiteReport>> {
        info!("Starting backup run...");
        if dry_run {
            let reports = jobs.iter().map(|job| self.plan_site(job)).collect::<Result<Vec<_>>>()?;
            info!("Dry run complete. Nothing was dumped, uploaded or deleted.");
            return Ok(reports);
        }

        let backup_dir = &self.settings.backup_dir;
        let created = !backup_dir.exists();
        fs::create_dir_all(backup_dir)?;
        let result = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(backup_dir)
            .map_err(Error::from)
            .and_then(|scratch| {
                debug!(path = %scratch.path().display(), "Created scratch directory.");
                let reports = jobs
                    .iter()
                    .map(|job| self.backup_site(job, scratch.path()))
                    .collect::<Result<Vec<_>>>();
                if let Err(e) = scratch.close() {
                    warn!(error = %e, "Could not remove scratch directory.");
                }
                reports
            });
        if created {
            self.remove_backup_dir();
        }

        if result.is_ok() {
            info!("Backup run finished successfully.");
        }
        result
    }

    fn backup_site(&self, job: &BackupJob, scratch: &Path) -> Result<SiteReport> {
        let site_span = span!(Level::INFO, "backup_site", site = %job.site.display());
        let _enter = site_span.enter();

        let Some(site_dir) = self.resolve_site(job) else {
            return Ok(skipped(job));
        };
        info!("Backing up site...");

        let credentials = wp_config::read_credentials(&site_dir, &self.settings.wp_config_file)?;
        let dumper = DumpRunner::new(&self.settings.dump_command, scratch);
        let dump_path = dumper.run(&credentials)?;
        drop(credentials);

        let archive_path = archive::create_archive(&site_dir, &dump_path, scratch, Utc::now())?;
        remove_artifact(&dump_path);

        let pruned = self.retention().prune()?;
        let archive = self.store.upload(&archive_path)?;
        remove_artifact(&archive_path);

        info!(%archive, pruned = pruned.len(), "Site backed up.");
        Ok(SiteReport {
            site: job.site.clone(),
            status: SiteStatus::Uploaded { archive, pruned },
        })
    }

    fn plan_site(&self, job: &BackupJob) -> Result<SiteReport> {
        let site_span = span!(Level::INFO, "plan_site", site = %job.site.display());
        let _enter = site_span.enter();

        let Some(site_dir) = self.resolve_site(job) else {
            return Ok(skipped(job));
        };
        let credentials = wp_config::read_credentials(&site_dir, &self.settings.wp_config_file)?;
        debug!(database = %credentials.database, "Configuration parsed.");

        let archive = archive::archive_name(&site_dir, Utc::now())?;
        let would_prune = self
            .retention()
            .plan()?
            .into_iter()
            .map(|record| record.name)
            .collect();
        Ok(SiteReport {
            site: job.site.clone(),
            status: SiteStatus::Planned { archive, would_prune },
        })
    }

    fn retention(&self) -> RetentionManager<'_, S> {
        RetentionManager::new(&self.store, self.settings.retention_limit, self.settings.retention_policy)
    }

    /// The site directory as configured, or `None` when it does not exist.
    /// Symlinks are kept so archives are named after the configured path.
    fn resolve_site(&self, job: &BackupJob) -> Option<PathBuf> {
        if !job.site.is_dir() {
            warn!("Site directory not found, skipping.");
            return None;
        }
        match job.site.file_name() {
            Some(_) => Some(job.site.clone()),
            // `.` or `..` carry no name of their own.
            None => fs::canonicalize(&job.site).ok(),
        }
    }

    fn remove_backup_dir(&self) {
        let dir = &self.settings.backup_dir;
        if !dir.exists() {
            return;
        }
        debug!(path = %dir.display(), "Removing backup directory.");
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "Could not remove backup directory.");
        }
    }
}

fn skipped(job: &BackupJob) -> SiteReport {
    SiteReport {
        site: job.site.clone(),
        status: SiteStatus::Skipped {
            reason: format!("directory not found: {}", job.site.display()),
        },
    }
}

fn remove_artifact(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Could not remove local artifact.");
    }
}
