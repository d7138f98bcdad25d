use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// How a posting reached the catalog: scraped live, or served from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HarvestMode {
    Static,
    #[default]
    Dynamic,
}

impl HarvestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestMode::Static => "static",
            HarvestMode::Dynamic => "dynamic",
        }
    }
}

/// Canonical, normalized job posting. `(source, job_url)` is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub source: String,
    pub mode: HarvestMode,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub currency: Option<String>,
    pub tags: Vec<String>,
    pub posted_date: DateTime<Utc>,
    pub job_url: Url,
    pub is_remote: bool,
}

impl JobPosting {
    pub fn key(&self) -> (&str, &str) {
        (&self.source, self.job_url.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Technology,
    Experience,
    Location,
    JobType,
    Other,
}

impl TagCategory {
    pub const ALL: [TagCategory; 5] = [
        TagCategory::Technology,
        TagCategory::Experience,
        TagCategory::Location,
        TagCategory::JobType,
        TagCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Technology => "technology",
            TagCategory::Experience => "experience",
            TagCategory::Location => "location",
            TagCategory::JobType => "job_type",
            TagCategory::Other => "other",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown tag category: {}", s))
    }
}

/// Live count and metadata for one normalized tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub tag: String,
    pub count: i64,
    pub category: TagCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}
