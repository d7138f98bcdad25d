use super::rules::{ExtractionRules, FieldRule};
use crate::drivers::{DriverError, PageElement};
use log::trace;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("Result element has no job URL")]
    MissingUrl,

    #[error("Invalid job URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid selector {selector:?} for field {field}: {reason}")]
    InvalidRule {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("Element query failed: {0}")]
    Query(#[from] DriverError),
}

/// Field strings read from one result element, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPosting {
    pub job_url: Url,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub posted: Option<String>,
    pub tags: Vec<String>,
}

/// Applies a source's rule table to result elements.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: ExtractionRules,
}

impl FieldExtractor {
    pub fn new(rules: ExtractionRules) -> Result<Self, ExtractionError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    pub fn results_selector(&self) -> &str {
        &self.rules.results
    }

    /// Reads every field of `element`. Relative job URLs are resolved against
    /// `page_url`. Only a missing or unusable job URL is an error; any other
    /// field that no rule matches is left empty.
    pub fn extract(
        &self,
        element: &PageElement,
        page_url: Option<&Url>,
    ) -> Result<RawPosting, ExtractionError> {
        let raw_url = first_value(element, &self.rules.job_url)?
            .or_else(|| self.rules.job_url.default.clone())
            .ok_or(ExtractionError::MissingUrl)?;
        let job_url = resolve_url(&raw_url, page_url)?;

        let title = self.single(element, &self.rules.title, &job_url)?;
        let company = self.single(element, &self.rules.company, &job_url)?;
        let location = self.single(element, &self.rules.location, &job_url)?;
        let salary = self.single(element, &self.rules.salary, &job_url)?;
        let posted = self.single(element, &self.rules.posted, &job_url)?;
        let tags = all_values(element, &self.rules.tags)?;

        trace!("Extracted {:?} from {}", title, job_url);
        Ok(RawPosting {
            title: title.unwrap_or_default(),
            company: company.unwrap_or_default(),
            location,
            salary,
            posted,
            tags,
            job_url,
        })
    }

    fn single(
        &self,
        element: &PageElement,
        rule: &FieldRule,
        job_url: &Url,
    ) -> Result<Option<String>, ExtractionError> {
        Ok(first_value(element, rule)?
            .or_else(|| rule.slug.as_ref().and_then(|slug| slug.derive(job_url)))
            .or_else(|| rule.default.clone()))
    }
}

/// First candidate whose first match yields a non-empty value.
fn first_value(element: &PageElement, rule: &FieldRule) -> Result<Option<String>, ExtractionError> {
    for candidate in &rule.candidates {
        let matches = element.query(candidate.selector())?;
        if let Some(value) = matches.first().and_then(|m| candidate.read(m)) {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Values of every match of the first candidate that yields any.
fn all_values(element: &PageElement, rule: &FieldRule) -> Result<Vec<String>, ExtractionError> {
    for candidate in &rule.candidates {
        let values: Vec<String> = element
            .query(candidate.selector())?
            .iter()
            .filter_map(|m| candidate.read(m))
            .collect();
        if !values.is_empty() {
            return Ok(values);
        }
    }
    Ok(Vec::new())
}

fn resolve_url(raw: &str, base: Option<&Url>) -> Result<Url, ExtractionError> {
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    let url = parsed.map_err(|e| ExtractionError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ExtractionError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}
