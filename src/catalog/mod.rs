//! Persistence and search over a [`JobStore`], with tag counts kept in step.

mod tag_index;

pub use tag_index::{categorize_tag, TagIndex};

use crate::models::{JobPosting, TagCategory, TagRecord};
use crate::normalize::normalize_tags;
use crate::storage::{InsertOutcome, JobStore, PersistReport, SearchFilters, StorageError};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `now` minus `days` (negative counts as zero), clamped to the earliest
/// representable instant.
fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, Serialize)]
pub struct TagStatistics {
    pub total_tags: u64,
    pub most_popular_tags: Vec<TagRecord>,
    pub tags_by_category: BTreeMap<TagCategory, Vec<TagRecord>>,
    pub recent_tags: Vec<TagRecord>,
    /// Percent change of tags created in the last 7 days against the 7 before.
    pub tag_growth_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatistics {
    pub total_jobs: u64,
    pub remote_jobs: u64,
    /// Postings dated within the last 7 days.
    pub recent_jobs: u64,
    pub jobs_by_source: Vec<SourceCount>,
}

#[derive(Clone)]
pub struct JobCatalog {
    store: Arc<dyn JobStore>,
    tags: TagIndex,
}

impl JobCatalog {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            tags: TagIndex::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        self.store.ping().await
    }

    /// Stores one posting. Tag counts move only when the posting was new.
    pub async fn insert(&self, posting: &JobPosting) -> Result<InsertOutcome, StorageError> {
        let outcome = self.insert_one(posting).await;
        self.store.flush().await?;
        outcome
    }

    async fn insert_one(&self, posting: &JobPosting) -> Result<InsertOutcome, StorageError> {
        let outcome = self.store.insert_job(posting).await?;
        match outcome {
            InsertOutcome::Inserted => self.tags.record_insert(&posting.tags).await?,
            InsertOutcome::Duplicate => {
                info!("Posting already stored: {} {}", posting.source, posting.job_url)
            }
        }
        Ok(outcome)
    }

    /// Stores each posting independently. Duplicates and per-posting
    /// failures are counted; an unavailable store aborts the batch.
    pub async fn insert_many(&self, postings: &[JobPosting]) -> Result<PersistReport, StorageError> {
        let mut report = PersistReport::default();
        for posting in postings {
            match self.insert_one(posting).await {
                Ok(InsertOutcome::Inserted) => report.inserted += 1,
                Ok(InsertOutcome::Duplicate) => report.duplicates += 1,
                Err(e @ StorageError::Unavailable(_)) => {
                    error!(
                        "Store unavailable after {} of {} postings: {}",
                        report.total(),
                        postings.len(),
                        e
                    );
                    self.flush_after_abort().await;
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed to store {}: {}", posting.job_url, e);
                    report.failed += 1;
                }
            }
        }
        info!(
            "Persisted {} posting(s): {} new, {} duplicate, {} failed",
            postings.len(),
            report.inserted,
            report.duplicates,
            report.failed
        );
        self.store.flush().await?;
        Ok(report)
    }

    async fn flush_after_abort(&self) {
        if let Err(e) = self.store.flush().await {
            warn!("Could not save partial batch: {}", e);
        }
    }

    /// Replaces a posting's tags and moves the counts from the old set to
    /// the new one. False when the posting does not exist.
    pub async fn update_tags(
        &self,
        source: &str,
        job_url: &str,
        tags: &[String],
    ) -> Result<bool, StorageError> {
        let Some(existing) = self.store.find_job(source, job_url).await? else {
            return Ok(false);
        };
        let tags = normalize_tags(tags);
        if !self.store.set_job_tags(source, job_url, &tags).await? {
            return Ok(false);
        }
        let replaced = self.tags.replace(&existing.tags, &tags).await;
        self.store.flush().await?;
        replaced?;
        info!("Updated tags of {} {}: {:?}", source, job_url, tags);
        Ok(true)
    }

    /// Deletes postings dated before `cutoff`. Tags are decremented only for
    /// postings this call actually deleted.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let stale = self.store.jobs_posted_before(cutoff).await?;
        let mut deleted = 0;
        for posting in &stale {
            let removed = match self
                .store
                .delete_job(&posting.source, posting.job_url.as_str())
                .await
            {
                Ok(true) => self.tags.record_removal(&posting.tags).await.map(|_| true),
                other => other,
            };
            match removed {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    self.flush_after_abort().await;
                    return Err(e);
                }
            }
        }
        self.store.flush().await?;
        info!("Purged {} posting(s) dated before {}", deleted, cutoff);
        Ok(deleted)
    }

    pub async fn purge_older_than_days(&self, days: i64) -> Result<usize, StorageError> {
        self.purge_older_than(days_before(Utc::now(), days))
            .await
    }

    pub async fn count_matching(&self, filters: &SearchFilters) -> Result<u64, StorageError> {
        self.store.count_jobs(filters).await
    }

    /// Newest first.
    pub async fn find_matching(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobPosting>, StorageError> {
        self.store.find_jobs(filters, limit, offset).await
    }

    pub async fn top_tags(
        &self,
        limit: usize,
        category: Option<TagCategory>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        self.store.top_tags(limit, category).await
    }

    pub async fn tags_by_category(
        &self,
    ) -> Result<BTreeMap<TagCategory, Vec<TagRecord>>, StorageError> {
        Ok(self.store.tags_by_category().await?.into_iter().collect())
    }

    pub async fn get_tag(&self, tag: &str) -> Result<Option<TagRecord>, StorageError> {
        self.store.get_tag(&tag.trim().to_lowercase()).await
    }

    pub async fn search_tags(&self, needle: &str, limit: usize) -> Result<Vec<TagRecord>, StorageError> {
        self.store.search_tags(needle, limit).await
    }

    /// Tags first seen within the last `days` days, newest first.
    pub async fn recent_tags(&self, days: i64, limit: usize) -> Result<Vec<TagRecord>, StorageError> {
        let since = days_before(Utc::now(), days);
        self.store.tags_created_between(since, None, Some(limit)).await
    }

    pub async fn update_tag_metadata(
        &self,
        tag: &str,
        category: Option<TagCategory>,
        synonyms: Option<&[String]>,
    ) -> Result<bool, StorageError> {
        let updated = self
            .store
            .update_tag_metadata(&tag.trim().to_lowercase(), category, synonyms, Utc::now())
            .await?;
        self.store.flush().await?;
        Ok(updated)
    }

    pub async fn tag_statistics(&self) -> Result<TagStatistics, StorageError> {
        let now = Utc::now();
        let week_ago = days_before(now, 7);
        let two_weeks_ago = days_before(now, 14);

        let recent_count = self
            .store
            .tags_created_between(week_ago, None, None)
            .await?
            .len();
        let previous_count = self
            .store
            .tags_created_between(two_weeks_ago, Some(week_ago), None)
            .await?
            .len();
        let growth = (recent_count as f64 - previous_count as f64) / previous_count.max(1) as f64;

        Ok(TagStatistics {
            total_tags: self.store.count_tags().await?,
            most_popular_tags: self.top_tags(10, None).await?,
            tags_by_category: self.tags_by_category().await?,
            recent_tags: self.recent_tags(7, 5).await?,
            tag_growth_rate: growth * 100.0,
        })
    }

    pub async fn job_statistics(&self) -> Result<JobStatistics, StorageError> {
        let remote = SearchFilters {
            is_remote: Some(true),
            ..SearchFilters::default()
        };
        let recent = SearchFilters {
            posted_after: Some(days_before(Utc::now(), 7)),
            ..SearchFilters::default()
        };

        Ok(JobStatistics {
            total_jobs: self.store.count_jobs(&SearchFilters::default()).await?,
            remote_jobs: self.store.count_jobs(&remote).await?,
            recent_jobs: self.store.count_jobs(&recent).await?,
            jobs_by_source: self
                .store
                .count_jobs_by_source()
                .await?
                .into_iter()
                .map(|(source, count)| SourceCount { source, count })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests;
