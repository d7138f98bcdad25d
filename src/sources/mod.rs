//! Listing sites described as data: how to build a results-page URL and
//! which rule table reads the postings on it.

mod builtin;
mod listing;

pub use builtin::{builtin_sources, linkedin, naukri};
pub use listing::{ListingTemplate, PlaceholderEncoding};

use crate::core::paginator::PageCursor;
use crate::core::{HarvestError, HarvestResult};
use crate::parser::ExtractionRules;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub id: String,
    /// Results a full listing page holds. A shorter page is the last one.
    pub page_size: usize,
    /// Hard ceiling on pages fetched per harvest.
    pub max_pages: usize,
    #[serde(default)]
    pub default_query: Option<String>,
    #[serde(default)]
    pub default_location: Option<String>,
    pub listing: ListingTemplate,
    pub rules: ExtractionRules,
}

impl SourceProfile {
    /// Looks up a built-in source by id.
    pub fn builtin(id: &str) -> Option<Self> {
        builtin_sources()
            .into_iter()
            .find(|source| source.id.eq_ignore_ascii_case(id.trim()))
    }

    /// Parses a profile from JSON and checks its rule table.
    pub fn from_json(json: &str) -> HarvestResult<Self> {
        let profile: SourceProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> HarvestResult<()> {
        if self.id.trim().is_empty() {
            return Err(HarvestError::Config("source id must not be empty".to_string()));
        }
        if self.page_size == 0 || self.max_pages == 0 {
            return Err(HarvestError::Config(format!(
                "source {}: page_size and max_pages must be positive",
                self.id
            )));
        }
        self.rules.validate()?;
        Ok(())
    }

    /// The query actually searched for: `query` trimmed, or the source default.
    pub fn resolve_query(&self, query: &str) -> Option<String> {
        let query = query.trim();
        if query.is_empty() {
            self.default_query.clone()
        } else {
            Some(query.to_string())
        }
    }

    pub fn resolve_location(&self, location: Option<&str>) -> Option<String> {
        location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_location.clone())
    }

    /// URL of the results page at `cursor`.
    pub fn listing_url(
        &self,
        query: &str,
        location: Option<&str>,
        cursor: &PageCursor,
    ) -> HarvestResult<Url> {
        let query = self.resolve_query(query).ok_or_else(|| {
            HarvestError::Config(format!("source {} needs a search query", self.id))
        })?;
        let location = self.resolve_location(location);
        self.listing
            .render(&query, location.as_deref(), cursor, self.page_size)
    }
}
