use crate::models::JobPosting;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posting filters. Text fields are case-insensitive literal substring
/// matches; `tags` matches postings carrying any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Matched against the title.
    pub query: Option<String>,
    /// Exact source id.
    pub source: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub is_remote: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Inclusive.
    pub posted_after: Option<DateTime<Utc>>,
    /// Exclusive.
    pub posted_before: Option<DateTime<Utc>>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl SearchFilters {
    pub fn query_text(&self) -> Option<&str> {
        non_blank(&self.query)
    }

    pub fn source_id(&self) -> Option<&str> {
        non_blank(&self.source)
    }

    pub fn company_text(&self) -> Option<&str> {
        non_blank(&self.company)
    }

    pub fn location_text(&self) -> Option<&str> {
        non_blank(&self.location)
    }

    /// Requested tags, trimmed and lowercased; blanks dropped.
    pub fn tag_set(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn matches(&self, posting: &JobPosting) -> bool {
        if let Some(query) = self.query_text() {
            if !contains_ci(&posting.title, query) {
                return false;
            }
        }
        if let Some(source) = self.source_id() {
            if posting.source != source {
                return false;
            }
        }
        if let Some(company) = self.company_text() {
            if !contains_ci(&posting.company, company) {
                return false;
            }
        }
        if let Some(location) = self.location_text() {
            match &posting.location {
                Some(l) if contains_ci(l, location) => {}
                _ => return false,
            }
        }
        if let Some(is_remote) = self.is_remote {
            if posting.is_remote != is_remote {
                return false;
            }
        }
        let tags = self.tag_set();
        if !tags.is_empty() && !posting.tags.iter().any(|t| tags.contains(t)) {
            return false;
        }
        if let Some(after) = self.posted_after {
            if posting.posted_date < after {
                return false;
            }
        }
        if let Some(before) = self.posted_before {
            if posting.posted_date >= before {
                return false;
            }
        }
        true
    }
}

/// What happened to a batch of postings handed to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl PersistReport {
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.failed
    }
}
