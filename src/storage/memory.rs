use super::base::{InsertOutcome, JobStore, StorageError};
use super::types::SearchFilters;
use crate::models::{JobPosting, TagCategory, TagRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type JobKey = (String, String);

/// Serializable image of a store: postings in insertion order, tags by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub jobs: Vec<JobPosting>,
    pub tags: Vec<TagRecord>,
}

/// Process-local store. Each tag record is updated under one lock, which
/// gives the same per-document atomicity the document store provides.
#[derive(Debug)]
pub struct InMemoryStore {
    jobs: RwLock<HashMap<JobKey, (u64, JobPosting)>>,
    tags: Mutex<HashMap<String, TagRecord>>,
    sequence: AtomicU64,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(source: &str, job_url: &str) -> JobKey {
    (source.to_string(), job_url.to_string())
}

fn by_count_desc(records: &mut [TagRecord]) {
    records.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            tags: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates an outage: while false every operation fails with
    /// [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory store marked unavailable".to_string()))
        }
    }

    /// Rebuilds a store from a snapshot; a repeated `(source, job_url)` keeps
    /// the later posting.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut jobs = store.jobs.write();
            for posting in snapshot.jobs {
                let seq = store.sequence.fetch_add(1, Ordering::SeqCst);
                jobs.insert(key(&posting.source, posting.job_url.as_str()), (seq, posting));
            }
        }
        store
            .tags
            .lock()
            .extend(snapshot.tags.into_iter().map(|r| (r.tag.clone(), r)));
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut jobs: Vec<(u64, JobPosting)> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|(seq, _)| *seq);
        let mut tags: Vec<TagRecord> = self.tags.lock().values().cloned().collect();
        tags.sort_by(|a, b| a.tag.cmp(&b.tag));
        StoreSnapshot {
            jobs: jobs.into_iter().map(|(_, posting)| posting).collect(),
            tags,
        }
    }

    fn matching(&self, filters: &SearchFilters) -> Vec<(u64, JobPosting)> {
        self.jobs
            .read()
            .values()
            .filter(|(_, posting)| filters.matches(posting))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.check()
    }

    async fn insert_job(&self, posting: &JobPosting) -> Result<InsertOutcome, StorageError> {
        self.check()?;
        let mut jobs = self.jobs.write();
        let key = key(&posting.source, posting.job_url.as_str());
        if jobs.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        jobs.insert(key, (seq, posting.clone()));
        Ok(InsertOutcome::Inserted)
    }

    async fn find_job(
        &self,
        source: &str,
        job_url: &str,
    ) -> Result<Option<JobPosting>, StorageError> {
        self.check()?;
        Ok(self
            .jobs
            .read()
            .get(&key(source, job_url))
            .map(|(_, posting)| posting.clone()))
    }

    async fn set_job_tags(
        &self,
        source: &str,
        job_url: &str,
        tags: &[String],
    ) -> Result<bool, StorageError> {
        self.check()?;
        Ok(match self.jobs.write().get_mut(&key(source, job_url)) {
            Some((_, posting)) => {
                posting.tags = tags.to_vec();
                true
            }
            None => false,
        })
    }

    async fn delete_job(&self, source: &str, job_url: &str) -> Result<bool, StorageError> {
        self.check()?;
        Ok(self.jobs.write().remove(&key(source, job_url)).is_some())
    }

    async fn jobs_posted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobPosting>, StorageError> {
        self.check()?;
        let filters = SearchFilters {
            posted_before: Some(cutoff),
            ..SearchFilters::default()
        };
        Ok(self.matching(&filters).into_iter().map(|(_, p)| p).collect())
    }

    async fn count_jobs(&self, filters: &SearchFilters) -> Result<u64, StorageError> {
        self.check()?;
        Ok(self.matching(filters).len() as u64)
    }

    async fn find_jobs(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobPosting>, StorageError> {
        self.check()?;
        let mut found = self.matching(filters);
        found.sort_by(|(seq_a, a), (seq_b, b)| {
            b.posted_date.cmp(&a.posted_date).then(seq_a.cmp(seq_b))
        });
        Ok(found
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, posting)| posting)
            .collect())
    }

    async fn count_jobs_by_source(&self) -> Result<Vec<(String, u64)>, StorageError> {
        self.check()?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for (_, posting) in self.jobs.read().values() {
            *counts.entry(posting.source.clone()).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }

    async fn increment_tag(
        &self,
        tag: &str,
        category: TagCategory,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check()?;
        let mut tags = self.tags.lock();
        let record = tags.entry(tag.to_string()).or_insert_with(|| TagRecord {
            tag: tag.to_string(),
            count: 0,
            category,
            created_at: now,
            updated_at: now,
            synonyms: Vec::new(),
        });
        record.count += 1;
        record.updated_at = now;
        Ok(())
    }

    async fn decrement_tag(&self, tag: &str, now: DateTime<Utc>) -> Result<bool, StorageError> {
        self.check()?;
        Ok(match self.tags.lock().get_mut(tag) {
            Some(record) if record.count > 0 => {
                record.count -= 1;
                record.updated_at = now;
                true
            }
            _ => false,
        })
    }

    async fn get_tag(&self, tag: &str) -> Result<Option<TagRecord>, StorageError> {
        self.check()?;
        Ok(self.tags.lock().get(tag).cloned())
    }

    async fn top_tags(
        &self,
        limit: usize,
        category: Option<TagCategory>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        self.check()?;
        let mut records: Vec<TagRecord> = self
            .tags
            .lock()
            .values()
            .filter(|r| category.map_or(true, |c| r.category == c))
            .cloned()
            .collect();
        by_count_desc(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn tags_by_category(&self) -> Result<Vec<(TagCategory, Vec<TagRecord>)>, StorageError> {
        self.check()?;
        let mut groups: BTreeMap<TagCategory, Vec<TagRecord>> = BTreeMap::new();
        for record in self.tags.lock().values() {
            groups.entry(record.category).or_default().push(record.clone());
        }
        Ok(groups
            .into_iter()
            .map(|(category, mut records)| {
                by_count_desc(&mut records);
                (category, records)
            })
            .collect())
    }

    async fn search_tags(&self, needle: &str, limit: usize) -> Result<Vec<TagRecord>, StorageError> {
        self.check()?;
        let needle = needle.trim().to_lowercase();
        let mut records: Vec<TagRecord> = self
            .tags
            .lock()
            .values()
            .filter(|r| r.tag.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        by_count_desc(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn tags_created_between(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        self.check()?;
        let mut records: Vec<TagRecord> = self
            .tags
            .lock()
            .values()
            .filter(|r| r.created_at >= since && until.map_or(true, |u| r.created_at < u))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.tag.cmp(&b.tag)));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn count_tags(&self) -> Result<u64, StorageError> {
        self.check()?;
        Ok(self.tags.lock().len() as u64)
    }

    async fn update_tag_metadata(
        &self,
        tag: &str,
        category: Option<TagCategory>,
        synonyms: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        self.check()?;
        Ok(match self.tags.lock().get_mut(tag) {
            Some(record) => {
                if let Some(category) = category {
                    record.category = category;
                }
                if let Some(synonyms) = synonyms {
                    record.synonyms = synonyms.to_vec();
                }
                record.updated_at = now;
                true
            }
            None => false,
        })
    }
}
