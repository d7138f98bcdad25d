//! Turns extracted field strings into a canonical [`JobPosting`].

mod date;
mod salary;
mod tags;

pub use date::{parse_posted_date, parse_posted_date_at};
pub use salary::{parse_salary, SalaryRange};
pub use tags::{derive_is_remote, normalize_tags};

use crate::core::HarvestConfig;
use crate::models::{HarvestMode, JobPosting};
use crate::parser::RawPosting;
use chrono::{DateTime, FixedOffset, Utc};

/// What the harvest was asked for; feeds the context tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchContext {
    pub source: String,
    pub query: Option<String>,
    pub location: Option<String>,
}

impl SearchContext {
    pub fn new(source: &str, query: &str, location: Option<&str>) -> Self {
        let non_blank = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            source: source.to_string(),
            query: non_blank(query),
            location: location.and_then(non_blank),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    utc_offset: FixedOffset,
    context_tags: bool,
}

impl Normalizer {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            utc_offset: config.utc_offset,
            context_tags: config.context_tags,
        }
    }

    pub fn normalize(&self, raw: RawPosting, context: &SearchContext) -> JobPosting {
        self.normalize_at(raw, context, Utc::now())
    }

    pub fn normalize_at(
        &self,
        raw: RawPosting,
        context: &SearchContext,
        now: DateTime<Utc>,
    ) -> JobPosting {
        let blank_to_none = |s: Option<String>| {
            s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        let title = raw.title.trim().to_string();
        let company = raw.company.trim().to_string();
        let location = blank_to_none(raw.location);
        let salary = blank_to_none(raw.salary);

        let range = parse_salary(salary.as_deref());
        let posted_date =
            parse_posted_date_at(raw.posted.as_deref().unwrap_or("today"), self.utc_offset, now);

        let page_tags = normalize_tags(&raw.tags);
        let is_remote = derive_is_remote(&title, location.as_deref(), &page_tags);

        let tags = if self.context_tags {
            let mut all = page_tags;
            all.extend(self.context_tags(context, &company, location.as_deref(), is_remote));
            normalize_tags(all)
        } else {
            page_tags
        };

        JobPosting {
            source: context.source.clone(),
            mode: HarvestMode::Dynamic,
            title,
            company,
            location,
            salary,
            salary_min: range.min,
            salary_max: range.max,
            currency: range.currency,
            tags,
            posted_date,
            job_url: raw.job_url,
            is_remote,
        }
    }

    fn context_tags(
        &self,
        context: &SearchContext,
        company: &str,
        job_location: Option<&str>,
        is_remote: bool,
    ) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(query) = &context.query {
            tags.push(format!("search:{}", query));
            tags.push(format!("query:{}", query));
        }
        if let Some(location) = &context.location {
            tags.push(format!("location:{}", location));
            tags.push(format!("search_location:{}", location));
        }
        if let Some(job_location) = job_location {
            tags.push(format!("job_location:{}", job_location));
        }
        if !company.is_empty() {
            tags.push(format!("company:{}", company));
        }
        tags.push(format!("source:{}", context.source));
        tags.push(format!("mode:{}", HarvestMode::Dynamic.as_str()));
        if is_remote {
            tags.push("remote".to_string());
        }
        tags
    }
}
