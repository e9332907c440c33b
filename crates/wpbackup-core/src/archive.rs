use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Entry name of the database dump inside every archive.
pub const DUMP_ENTRY_NAME: &str = "sql.dump";
pub const ARCHIVE_EXTENSION: &str = "tar.gz";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

fn site_name(site_dir: &Path) -> Result<&str> {
    site_dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidSitePath {
            path: site_dir.to_path_buf(),
        })
}

/// `<site basename>_<YYYY-MM-DD-HH-MM-SS>.tar.gz`
pub fn archive_name(site_dir: &Path, at: DateTime<Utc>) -> Result<String> {
    Ok(format!(
        "{}_{}.{}",
        site_name(site_dir)?,
        at.format(TIMESTAMP_FORMAT),
        ARCHIVE_EXTENSION
    ))
}

/// Writes `<dest_dir>/<archive_name>` holding the site tree under its base name plus the dump as [`DUMP_ENTRY_NAME`].
#[instrument(skip_all, fields(site = %site_dir.display()))]
pub fn create_archive(
    site_dir: &Path,
    dump_file: &Path,
    dest_dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    let root = Path::new(site_name(site_dir)?);
    let archive_path = dest_dir.join(archive_name(site_dir, at)?);
    debug!(archive = %archive_path.display(), "Archiving site and database dump.");

    let encoder = GzEncoder::new(File::create(&archive_path)?, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    let mut entries = 0usize;
    for entry in WalkDir::new(site_dir).follow_links(false) {
        let entry = entry?;
        if entry.path() == archive_path {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(site_dir)
            .map_err(|e| Error::Custom(format!("Unexpected walk entry: {}", e)))?;
        let name = root.join(relative);
        if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), &name)?;
        }
        entries += 1;
    }
    builder.append_path_with_name(dump_file, DUMP_ENTRY_NAME)?;

    builder.into_inner()?.finish()?;
    info!(archive = %archive_path.display(), entries, "Archive complete.");
    Ok(archive_path)
}
