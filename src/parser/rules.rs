use super::ExtractionError;
use crate::drivers::PageElement;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

/// One way of reading a value out of a result element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate {
    Text { selector: String },
    Attr { selector: String, attribute: String },
    /// The attribute when present and non-empty, the element text otherwise.
    AttrOrText { selector: String, attribute: String },
}

impl Candidate {
    pub fn text(selector: &str) -> Self {
        Candidate::Text {
            selector: selector.to_string(),
        }
    }

    pub fn attr(selector: &str, attribute: &str) -> Self {
        Candidate::Attr {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn attr_or_text(selector: &str, attribute: &str) -> Self {
        Candidate::AttrOrText {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn selector(&self) -> &str {
        match self {
            Candidate::Text { selector }
            | Candidate::Attr { selector, .. }
            | Candidate::AttrOrText { selector, .. } => selector,
        }
    }

    /// Value of a single matched element; empty strings count as absent.
    pub(crate) fn read(&self, element: &PageElement) -> Option<String> {
        let value = match self {
            Candidate::Text { .. } => Some(element.text()),
            Candidate::Attr { attribute, .. } => element.attribute(attribute),
            Candidate::AttrOrText { attribute, .. } => element
                .attribute(attribute)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| Some(element.text())),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Derives a value from the last path segment of the posting URL when no
/// selector candidate produced one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlugFallback {
    /// Slug words after the first `skip`, up to a stop word, an experience
    /// range such as `3to5`, or a numeric id. Title-cased, space-joined.
    LeadingWords { skip: usize, stop_words: Vec<String> },
    /// Every slug word listed in `words`, title-cased, joined with ", ".
    KnownWords { words: Vec<String> },
}

fn slug_words(url: &Url) -> Vec<String> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|last| {
            last.split('-')
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_range_token(word: &str) -> bool {
    word.contains("to") && word.chars().any(|c| c.is_ascii_digit())
}

impl SlugFallback {
    pub fn derive(&self, url: &Url) -> Option<String> {
        let words = slug_words(url);
        let picked: Vec<String> = match self {
            SlugFallback::LeadingWords { skip, stop_words } => words
                .iter()
                .skip(*skip)
                .take_while(|w| {
                    !stop_words.iter().any(|s| s == *w)
                        && !is_range_token(w)
                        && !w.chars().all(|c| c.is_ascii_digit())
                })
                .map(|w| title_case(w))
                .collect(),
            SlugFallback::KnownWords { words: known } => words
                .iter()
                .filter(|w| known.iter().any(|k| k == *w))
                .map(|w| title_case(w))
                .collect(),
        };

        if picked.is_empty() {
            return None;
        }
        let separator = match self {
            SlugFallback::LeadingWords { .. } => " ",
            SlugFallback::KnownWords { .. } => ", ",
        };
        Some(picked.join(separator))
    }
}

/// Ordered fallback chain for one logical field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub slug: Option<SlugFallback>,
    /// Used when neither the candidates nor the slug produced anything.
    #[serde(default)]
    pub default: Option<String>,
}

impl FieldRule {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn with_slug(mut self, slug: SlugFallback) -> Self {
        self.slug = Some(slug);
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// Per-source rule table: where the result elements are and how each field
/// of one element is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Selects the result elements of a listing page.
    pub results: String,
    pub job_url: FieldRule,
    pub title: FieldRule,
    pub company: FieldRule,
    #[serde(default)]
    pub location: FieldRule,
    #[serde(default)]
    pub salary: FieldRule,
    #[serde(default)]
    pub posted: FieldRule,
    /// List field: every match of the first productive candidate.
    #[serde(default)]
    pub tags: FieldRule,
}

impl ExtractionRules {
    fn fields(&self) -> [(&'static str, &FieldRule); 7] {
        [
            ("job_url", &self.job_url),
            ("title", &self.title),
            ("company", &self.company),
            ("location", &self.location),
            ("salary", &self.salary),
            ("posted", &self.posted),
            ("tags", &self.tags),
        ]
    }

    /// Checks that every selector in the table parses.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        check_selector("results", &self.results)?;
        for (field, rule) in self.fields() {
            for candidate in &rule.candidates {
                check_selector(field, candidate.selector())?;
            }
        }
        Ok(())
    }
}

fn check_selector(field: &str, selector: &str) -> Result<(), ExtractionError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ExtractionError::InvalidRule {
            field: field.to_string(),
            selector: selector.to_string(),
            reason: e.to_string(),
        })
}
