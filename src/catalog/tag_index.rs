use crate::models::TagCategory;
use crate::normalize::normalize_tags;
use crate::storage::{JobStore, StorageError};
use chrono::Utc;
use log::debug;
use std::sync::Arc;

/// Keyword groups tried in order; the first group with a keyword contained
/// in the tag decides its category.
const CATEGORY_KEYWORDS: [(TagCategory, &[&str]); 4] = [
    (
        TagCategory::Technology,
        &[
            "python",
            "java",
            "javascript",
            "react",
            "node",
            "aws",
            "docker",
            "kubernetes",
            "sql",
            "nosql",
        ],
    ),
    (
        TagCategory::Experience,
        &["senior", "junior", "entry", "lead", "principal", "architect"],
    ),
    (
        TagCategory::Location,
        &["remote", "onsite", "hybrid", "india", "us", "uk", "canada"],
    ),
    (
        TagCategory::JobType,
        &["full-time", "part-time", "contract", "internship", "freelance"],
    ),
];

pub fn categorize_tag(tag: &str) -> TagCategory {
    let tag = tag.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| tag.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(TagCategory::Other)
}

/// Keeps tag records in step with the postings that reference them.
#[derive(Clone)]
pub struct TagIndex {
    store: Arc<dyn JobStore>,
}

impl TagIndex {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// One increment per distinct tag of a newly stored posting.
    pub async fn record_insert(&self, tags: &[String]) -> Result<(), StorageError> {
        let now = Utc::now();
        for tag in normalize_tags(tags) {
            let category = categorize_tag(&tag);
            self.store.increment_tag(&tag, category, now).await?;
        }
        debug!("Incremented {} tag(s)", tags.len());
        Ok(())
    }

    /// One clamped decrement per distinct tag of a removed posting.
    pub async fn record_removal(&self, tags: &[String]) -> Result<(), StorageError> {
        let now = Utc::now();
        for tag in normalize_tags(tags) {
            self.store.decrement_tag(&tag, now).await?;
        }
        Ok(())
    }

    /// Tag replacement: every old tag is decremented, then every new tag is
    /// incremented as on insert.
    pub async fn replace(&self, old: &[String], new: &[String]) -> Result<(), StorageError> {
        self.record_removal(old).await?;
        self.record_insert(new).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_in_group_order() {
        assert_eq!(categorize_tag("python"), TagCategory::Technology);
        assert_eq!(categorize_tag("PostgreSQL"), TagCategory::Technology);
        assert_eq!(categorize_tag("senior"), TagCategory::Experience);
        assert_eq!(categorize_tag("remote"), TagCategory::Location);
        assert_eq!(categorize_tag("full-time"), TagCategory::JobType);
        assert_eq!(categorize_tag("django"), TagCategory::Other);
    }

    #[test]
    fn test_first_matching_group_wins() {
        // Technology is checked before experience and location.
        assert_eq!(categorize_tag("senior java developer"), TagCategory::Technology);
        assert_eq!(categorize_tag("lead - remote"), TagCategory::Experience);
        // Substring matching: "business" contains "us".
        assert_eq!(categorize_tag("business"), TagCategory::Location);
    }
}
