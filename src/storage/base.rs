use super::types::SearchFilters;
use crate::models::{JobPosting, TagCategory, TagRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation failed: {0}")]
    Operation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Operation(error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialization(error.to_string())
    }
}

/// A duplicate `(source, job_url)` is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Postings collection plus tag collection.
///
/// Every tag count change is a single-document atomic update in the
/// backend; callers never read a count and write it back.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn ping(&self) -> Result<(), StorageError>;

    async fn insert_job(&self, posting: &JobPosting) -> Result<InsertOutcome, StorageError>;

    async fn find_job(&self, source: &str, job_url: &str)
        -> Result<Option<JobPosting>, StorageError>;

    /// Replaces the posting's tags; false when no such posting exists.
    async fn set_job_tags(
        &self,
        source: &str,
        job_url: &str,
        tags: &[String],
    ) -> Result<bool, StorageError>;

    /// False when no such posting exists.
    async fn delete_job(&self, source: &str, job_url: &str) -> Result<bool, StorageError>;

    async fn jobs_posted_before(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<JobPosting>, StorageError>;

    async fn count_jobs(&self, filters: &SearchFilters) -> Result<u64, StorageError>;

    /// Matching postings, newest `posted_date` first.
    async fn find_jobs(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobPosting>, StorageError>;

    /// Posting counts per source, largest first.
    async fn count_jobs_by_source(&self) -> Result<Vec<(String, u64)>, StorageError>;

    /// Adds one to the tag's count, creating the record with `category` if
    /// it does not exist yet.
    async fn increment_tag(
        &self,
        tag: &str,
        category: TagCategory,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Subtracts one unless the count is already zero. Returns whether a
    /// record was changed.
    async fn decrement_tag(&self, tag: &str, now: DateTime<Utc>) -> Result<bool, StorageError>;

    async fn get_tag(&self, tag: &str) -> Result<Option<TagRecord>, StorageError>;

    /// Highest counts first.
    async fn top_tags(
        &self,
        limit: usize,
        category: Option<TagCategory>,
    ) -> Result<Vec<TagRecord>, StorageError>;

    /// Every tag record grouped by category, each group by count descending.
    async fn tags_by_category(&self) -> Result<Vec<(TagCategory, Vec<TagRecord>)>, StorageError>;

    /// Tags whose name contains `needle` (case-insensitive), by count descending.
    async fn search_tags(&self, needle: &str, limit: usize) -> Result<Vec<TagRecord>, StorageError>;

    /// Tags created at or after `since`, newest first.
    async fn tags_created_between(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<TagRecord>, StorageError>;

    async fn count_tags(&self) -> Result<u64, StorageError>;

    /// False when the tag does not exist.
    async fn update_tag_metadata(
        &self,
        tag: &str,
        category: Option<TagCategory>,
        synonyms: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Makes earlier writes durable. Backends that write through have
    /// nothing to do.
    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
