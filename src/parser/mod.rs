mod extractor;
mod rules;

pub use extractor::{ExtractionError, FieldExtractor, RawPosting};
pub use rules::{Candidate, ExtractionRules, FieldRule, SlugFallback};

#[cfg(test)]
mod tests;
