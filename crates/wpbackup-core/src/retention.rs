//! Rolling retention window for archives kept in the bucket.

use crate::archive::TIMESTAMP_FORMAT;
use crate::error::Result;
use crate::models::ArchiveRecord;
use crate::storage::ObjectStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Delete the oldest archive only when the count equals the limit.
    /// Buckets already above the limit are left untouched.
    #[default]
    Exact,
    /// Delete as many of the oldest archives as needed to make room for one more.
    Ceiling,
}

/// Parses `<anything>_<YYYY-MM-DD-HH-MM-SS>.<ext>`. Returns `None` for any other name.
pub fn parse_archive_record(name: &str) -> Option<ArchiveRecord> {
    let (_, suffix) = name.rsplit_once('_')?;
    let (stamp, extension) = suffix.split_once('.')?;
    if extension.is_empty() {
        return None;
    }
    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some(ArchiveRecord {
        name: name.to_string(),
        timestamp,
    })
}

/// Chooses the archives to delete, oldest first.
pub fn select_expired(names: &[String], limit: usize, policy: RetentionPolicy) -> Vec<ArchiveRecord> {
    let mut records: Vec<ArchiveRecord> = names
        .iter()
        .filter_map(|name| parse_archive_record(name))
        .collect();
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.name.cmp(&b.name)));

    let count = records.len();
    let excess = match policy {
        RetentionPolicy::Exact if count == limit => 1,
        RetentionPolicy::Exact => {
            if count > limit {
                warn!(
                    count,
                    limit, "More dated archives than the retention limit; the exact policy does not prune them."
                );
            }
            0
        }
        RetentionPolicy::Ceiling if count >= limit => count - limit + 1,
        RetentionPolicy::Ceiling => 0,
    };
    records.truncate(excess);
    records
}

pub struct RetentionManager<'a, S: ?Sized> {
    store: &'a S,
    limit: usize,
    policy: RetentionPolicy,
}

impl<'a, S: ObjectStore + ?Sized> RetentionManager<'a, S> {
    pub fn new(store: &'a S, limit: usize, policy: RetentionPolicy) -> Self {
        Self { store, limit, policy }
    }

    /// Lists the bucket and returns what [`RetentionManager::prune`] would delete.
    pub fn plan(&self) -> Result<Vec<ArchiveRecord>> {
        let names = self.store.list()?;
        debug!(objects = names.len(), "Listed remote objects.");
        Ok(select_expired(&names, self.limit, self.policy))
    }

    /// Deletes expired archives and returns their names.
    #[instrument(skip(self), fields(limit = self.limit, policy = ?self.policy))]
    pub fn prune(&self) -> Result<Vec<String>> {
        let expired = self.plan()?;
        let mut deleted = Vec::with_capacity(expired.len());
        for record in expired {
            info!(key = %record.name, timestamp = %record.timestamp, "Removing expired archive.");
            self.store.delete(&record.name)?;
            deleted.push(record.name);
        }
        Ok(deleted)
    }
}
