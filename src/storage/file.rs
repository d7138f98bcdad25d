//! An [`InMemoryStore`] persisted to a JSON file, so separate runs of the
//! binary share postings and tag counts without a database.

use super::base::{InsertOutcome, JobStore, StorageError};
use super::memory::{InMemoryStore, StoreSnapshot};
use super::types::SearchFilters;
use crate::models::{JobPosting, TagCategory, TagRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
    dirty: AtomicBool,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Loads `path` if it exists; a missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let inner = match fs::read_to_string(&path) {
            Ok(json) => InMemoryStore::from_snapshot(serde_json::from_str::<StoreSnapshot>(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => InMemoryStore::new(),
            Err(e) => {
                return Err(StorageError::Unavailable(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        info!("Opened job store file {}", path.display());
        Ok(Self {
            path,
            inner,
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Writes a temporary file next to the target and renames it over, so a
    /// crash mid-write leaves the previous contents intact.
    fn write_snapshot(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let result = (|| -> Result<(), StorageError> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let snapshot = self.inner.snapshot();
            let staging = self.path.with_extension("json.tmp");
            fs::write(&staging, serde_json::to_string_pretty(&snapshot)?)?;
            fs::rename(&staging, &self.path)?;
            debug!(
                "Wrote {} posting(s) and {} tag(s) to {}",
                snapshot.jobs.len(),
                snapshot.tags.len(),
                self.path.display()
            );
            Ok(())
        })();
        if result.is_err() {
            self.mark_dirty();
        }
        result
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = self.write_snapshot() {
            error!("Failed to save job store to {}: {}", self.path.display(), e);
        }
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.inner.ping().await
    }

    async fn insert_job(&self, posting: &JobPosting) -> Result<InsertOutcome, StorageError> {
        let outcome = self.inner.insert_job(posting).await?;
        if outcome == InsertOutcome::Inserted {
            self.mark_dirty();
        }
        Ok(outcome)
    }

    async fn find_job(
        &self,
        source: &str,
        job_url: &str,
    ) -> Result<Option<JobPosting>, StorageError> {
        self.inner.find_job(source, job_url).await
    }

    async fn set_job_tags(
        &self,
        source: &str,
        job_url: &str,
        tags: &[String],
    ) -> Result<bool, StorageError> {
        let changed = self.inner.set_job_tags(source, job_url, tags).await?;
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    async fn delete_job(&self, source: &str, job_url: &str) -> Result<bool, StorageError> {
        let deleted = self.inner.delete_job(source, job_url).await?;
        if deleted {
            self.mark_dirty();
        }
        Ok(deleted)
    }

    async fn jobs_posted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobPosting>, StorageError> {
        self.inner.jobs_posted_before(cutoff).await
    }

    async fn count_jobs(&self, filters: &SearchFilters) -> Result<u64, StorageError> {
        self.inner.count_jobs(filters).await
    }

    async fn find_jobs(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobPosting>, StorageError> {
        self.inner.find_jobs(filters, limit, offset).await
    }

    async fn count_jobs_by_source(&self) -> Result<Vec<(String, u64)>, StorageError> {
        self.inner.count_jobs_by_source().await
    }

    async fn increment_tag(
        &self,
        tag: &str,
        category: TagCategory,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.inner.increment_tag(tag, category, now).await?;
        self.mark_dirty();
        Ok(())
    }

    async fn decrement_tag(&self, tag: &str, now: DateTime<Utc>) -> Result<bool, StorageError> {
        let changed = self.inner.decrement_tag(tag, now).await?;
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    async fn get_tag(&self, tag: &str) -> Result<Option<TagRecord>, StorageError> {
        self.inner.get_tag(tag).await
    }

    async fn top_tags(
        &self,
        limit: usize,
        category: Option<TagCategory>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        self.inner.top_tags(limit, category).await
    }

    async fn tags_by_category(&self) -> Result<Vec<(TagCategory, Vec<TagRecord>)>, StorageError> {
        self.inner.tags_by_category().await
    }

    async fn search_tags(&self, needle: &str, limit: usize) -> Result<Vec<TagRecord>, StorageError> {
        self.inner.search_tags(needle, limit).await
    }

    async fn tags_created_between(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        self.inner.tags_created_between(since, until, limit).await
    }

    async fn count_tags(&self) -> Result<u64, StorageError> {
        self.inner.count_tags().await
    }

    async fn update_tag_metadata(
        &self,
        tag: &str,
        category: Option<TagCategory>,
        synonyms: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let changed = self
            .inner
            .update_tag_metadata(tag, category, synonyms, now)
            .await?;
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.write_snapshot()
    }
}
