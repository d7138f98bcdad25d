use super::base::{InsertOutcome, JobStore, StorageError};
use super::types::SearchFilters;
use crate::core::StoreConfig;
use crate::models::{HarvestMode, JobPosting, TagCategory, TagRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use log::{debug, info, warn};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use url::Url;

const DUPLICATE_KEY: i32 = 11000;

/// Stored shape of a posting. Dates are BSON dates so range queries and
/// sorting happen in the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobDocument {
    source: String,
    mode: HarvestMode,
    title: String,
    company: String,
    location: Option<String>,
    salary: Option<String>,
    salary_min: Option<i64>,
    salary_max: Option<i64>,
    currency: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    posted_date: bson::DateTime,
    job_url: String,
    is_remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<bson::DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TagDocument {
    tag: String,
    count: i64,
    category: TagCategory,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
    #[serde(default)]
    synonyms: Vec<String>,
}

fn to_bson_date(date: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(date.timestamp_millis())
}

fn from_bson_date(date: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or_default()
}

impl JobDocument {
    fn from_posting(posting: &JobPosting, created_at: DateTime<Utc>) -> Self {
        Self {
            source: posting.source.clone(),
            mode: posting.mode,
            title: posting.title.clone(),
            company: posting.company.clone(),
            location: posting.location.clone(),
            salary: posting.salary.clone(),
            salary_min: posting.salary_min,
            salary_max: posting.salary_max,
            currency: posting.currency.clone(),
            tags: posting.tags.clone(),
            posted_date: to_bson_date(posting.posted_date),
            job_url: posting.job_url.to_string(),
            is_remote: posting.is_remote,
            created_at: Some(to_bson_date(created_at)),
        }
    }

    fn into_posting(self) -> Result<JobPosting, StorageError> {
        let job_url = Url::parse(&self.job_url).map_err(|e| {
            StorageError::Serialization(format!("stored job_url {:?}: {}", self.job_url, e))
        })?;
        Ok(JobPosting {
            source: self.source,
            mode: self.mode,
            title: self.title,
            company: self.company,
            location: self.location,
            salary: self.salary,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            currency: self.currency,
            tags: self.tags,
            posted_date: from_bson_date(self.posted_date),
            job_url,
            is_remote: self.is_remote,
        })
    }
}

impl From<TagDocument> for TagRecord {
    fn from(doc: TagDocument) -> Self {
        TagRecord {
            tag: doc.tag,
            count: doc.count,
            category: doc.category,
            created_at: from_bson_date(doc.created_at),
            updated_at: from_bson_date(doc.updated_at),
            synonyms: doc.synonyms,
        }
    }
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::Authentication { .. }
            | ErrorKind::DnsResolve { .. } => StorageError::Unavailable(err.to_string()),
            _ => StorageError::Operation(err.to_string()),
        }
    }
}

impl From<bson::ser::Error> for StorageError {
    fn from(err: bson::ser::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for StorageError {
    fn from(err: bson::de::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Case-insensitive literal substring match.
fn contains_regex(text: &str) -> Document {
    doc! { "$regex": regex::escape(text), "$options": "i" }
}

fn filter_document(filters: &SearchFilters) -> Document {
    let mut filter = Document::new();
    if let Some(query) = filters.query_text() {
        filter.insert("title", contains_regex(query));
    }
    if let Some(source) = filters.source_id() {
        filter.insert("source", source);
    }
    if let Some(company) = filters.company_text() {
        filter.insert("company", contains_regex(company));
    }
    if let Some(location) = filters.location_text() {
        filter.insert("location", contains_regex(location));
    }
    if let Some(is_remote) = filters.is_remote {
        filter.insert("is_remote", is_remote);
    }
    let tags = filters.tag_set();
    if !tags.is_empty() {
        filter.insert("tags", doc! { "$in": tags });
    }
    let mut posted = Document::new();
    if let Some(after) = filters.posted_after {
        posted.insert("$gte", to_bson_date(after));
    }
    if let Some(before) = filters.posted_before {
        posted.insert("$lt", to_bson_date(before));
    }
    if !posted.is_empty() {
        filter.insert("posted_date", posted);
    }
    filter
}

/// Postings and tag records in MongoDB.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    jobs: Collection<JobDocument>,
    tags: Collection<TagDocument>,
    database_name: String,
}

impl MongoStore {
    /// Connects, pings, and makes sure the indexes exist.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StorageError> {
        let uri = config
            .mongodb_uri
            .as_deref()
            .ok_or_else(|| StorageError::Unavailable("no MongoDB URI configured".to_string()))?;
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(&config.database);
        let store = Self {
            jobs: database.collection(&config.jobs_collection),
            tags: database.collection(&config.tags_collection),
            database_name: config.database.clone(),
            client,
        };
        store.ping().await?;
        store.create_indexes().await?;
        info!(
            "Connected to MongoDB database {} ({} / {})",
            config.database, config.jobs_collection, config.tags_collection
        );
        Ok(store)
    }

    async fn create_indexes(&self) -> Result<(), StorageError> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.jobs
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "source": 1, "job_url": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        for keys in [
            doc! { "title": 1 },
            doc! { "company": 1 },
            doc! { "location": 1 },
            doc! { "posted_date": -1 },
            doc! { "source": 1 },
            doc! { "tags": 1 },
            doc! { "is_remote": 1 },
        ] {
            self.jobs
                .create_index(IndexModel::builder().keys(keys).build())
                .await?;
        }

        self.tags
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "tag": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        for keys in [
            doc! { "count": -1 },
            doc! { "category": 1 },
            doc! { "created_at": -1 },
            doc! { "updated_at": -1 },
        ] {
            self.tags
                .create_index(IndexModel::builder().keys(keys).build())
                .await?;
        }
        debug!("MongoDB indexes ensured");
        Ok(())
    }

    async fn collect_tags(
        &self,
        filter: Document,
        sort: Document,
        limit: Option<usize>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        let mut find = self.tags.find(filter).sort(sort);
        if let Some(limit) = limit {
            find = find.limit(limit as i64);
        }
        let docs: Vec<TagDocument> = find.await?.try_collect().await?;
        Ok(docs.into_iter().map(TagRecord::from).collect())
    }
}

#[async_trait]
impl JobStore for MongoStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.client
            .database(&self.database_name)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn insert_job(&self, posting: &JobPosting) -> Result<InsertOutcome, StorageError> {
        let document = JobDocument::from_posting(posting, Utc::now());
        match self.jobs.insert_one(document).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_job(
        &self,
        source: &str,
        job_url: &str,
    ) -> Result<Option<JobPosting>, StorageError> {
        self.jobs
            .find_one(doc! { "source": source, "job_url": job_url })
            .await?
            .map(JobDocument::into_posting)
            .transpose()
    }

    async fn set_job_tags(
        &self,
        source: &str,
        job_url: &str,
        tags: &[String],
    ) -> Result<bool, StorageError> {
        let result = self
            .jobs
            .update_one(
                doc! { "source": source, "job_url": job_url },
                doc! { "$set": { "tags": tags.to_vec(), "updated_at": to_bson_date(Utc::now()) } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_job(&self, source: &str, job_url: &str) -> Result<bool, StorageError> {
        let result = self
            .jobs
            .delete_one(doc! { "source": source, "job_url": job_url })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn jobs_posted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobPosting>, StorageError> {
        let docs: Vec<JobDocument> = self
            .jobs
            .find(doc! { "posted_date": { "$lt": to_bson_date(cutoff) } })
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(JobDocument::into_posting).collect()
    }

    async fn count_jobs(&self, filters: &SearchFilters) -> Result<u64, StorageError> {
        Ok(self.jobs.count_documents(filter_document(filters)).await?)
    }

    async fn find_jobs(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobPosting>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let docs: Vec<JobDocument> = self
            .jobs
            .find(filter_document(filters))
            .sort(doc! { "posted_date": -1 })
            .skip(offset as u64)
            .limit(limit as i64)
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(JobDocument::into_posting).collect()
    }

    async fn count_jobs_by_source(&self) -> Result<Vec<(String, u64)>, StorageError> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$source", "count": { "$sum": 1 } } },
            doc! { "$sort": { "count": -1, "_id": 1 } },
        ];
        let groups: Vec<Document> = self.jobs.aggregate(pipeline).await?.try_collect().await?;
        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let source = group.get_str("_id").ok()?.to_string();
                let count = match group.get("count")? {
                    Bson::Int32(n) => i64::from(*n),
                    Bson::Int64(n) => *n,
                    _ => return None,
                };
                Some((source, count.max(0) as u64))
            })
            .collect())
    }

    async fn increment_tag(
        &self,
        tag: &str,
        category: TagCategory,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let now = to_bson_date(now);
        self.tags
            .update_one(
                doc! { "tag": tag },
                doc! {
                    "$inc": { "count": 1_i64 },
                    "$setOnInsert": {
                        "created_at": now,
                        "category": category.as_str(),
                        "synonyms": Bson::Array(Vec::new()),
                    },
                    "$set": { "updated_at": now },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn decrement_tag(&self, tag: &str, now: DateTime<Utc>) -> Result<bool, StorageError> {
        // The count guard keeps the decrement atomic and floors it at zero.
        let result = self
            .tags
            .update_one(
                doc! { "tag": tag, "count": { "$gt": 0 } },
                doc! {
                    "$inc": { "count": -1_i64 },
                    "$set": { "updated_at": to_bson_date(now) },
                },
            )
            .await?;
        if result.matched_count == 0 {
            warn!("Tag {:?} not decremented: missing or already at zero", tag);
        }
        Ok(result.matched_count > 0)
    }

    async fn get_tag(&self, tag: &str) -> Result<Option<TagRecord>, StorageError> {
        Ok(self
            .tags
            .find_one(doc! { "tag": tag })
            .await?
            .map(TagRecord::from))
    }

    async fn top_tags(
        &self,
        limit: usize,
        category: Option<TagCategory>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let filter = match category {
            Some(category) => doc! { "category": category.as_str() },
            None => Document::new(),
        };
        self.collect_tags(filter, doc! { "count": -1, "tag": 1 }, Some(limit))
            .await
    }

    async fn tags_by_category(&self) -> Result<Vec<(TagCategory, Vec<TagRecord>)>, StorageError> {
        let pipeline = vec![
            doc! { "$sort": { "count": -1, "tag": 1 } },
            doc! { "$group": { "_id": "$category", "tags": { "$push": "$$ROOT" } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let groups: Vec<Document> = self.tags.aggregate(pipeline).await?.try_collect().await?;

        let mut result = Vec::new();
        for group in groups {
            let category = group
                .get_str("_id")
                .ok()
                .and_then(|c| c.parse::<TagCategory>().ok())
                .unwrap_or(TagCategory::Other);
            let mut records = Vec::new();
            if let Ok(tags) = group.get_array("tags") {
                for tag in tags {
                    if let Bson::Document(doc) = tag {
                        let doc: TagDocument = bson::from_document(doc.clone())?;
                        records.push(TagRecord::from(doc));
                    }
                }
            }
            records.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
            result.push((category, records));
        }
        result.sort_by_key(|(category, _)| *category);
        Ok(result)
    }

    async fn search_tags(&self, needle: &str, limit: usize) -> Result<Vec<TagRecord>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.collect_tags(
            doc! { "tag": contains_regex(needle.trim()) },
            doc! { "count": -1, "tag": 1 },
            Some(limit),
        )
        .await
    }

    async fn tags_created_between(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<TagRecord>, StorageError> {
        let mut window = doc! { "$gte": to_bson_date(since) };
        if let Some(until) = until {
            window.insert("$lt", to_bson_date(until));
        }
        self.collect_tags(
            doc! { "created_at": window },
            doc! { "created_at": -1, "tag": 1 },
            limit,
        )
        .await
    }

    async fn count_tags(&self) -> Result<u64, StorageError> {
        Ok(self.tags.count_documents(doc! {}).await?)
    }

    async fn update_tag_metadata(
        &self,
        tag: &str,
        category: Option<TagCategory>,
        synonyms: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut update = doc! { "updated_at": to_bson_date(now) };
        if let Some(category) = category {
            update.insert("category", category.as_str());
        }
        if let Some(synonyms) = synonyms {
            update.insert("synonyms", synonyms.to_vec());
        }
        let result = self
            .tags
            .update_one(doc! { "tag": tag }, doc! { "$set": update })
            .await?;
        Ok(result.matched_count > 0)
    }
}
