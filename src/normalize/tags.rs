use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static REMOTE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\bremote\b", r"\bwork from home\b", r"\bwfh\b", r"\banywhere\b"]
        .iter()
        .map(|p| Regex::new(p).expect("valid remote pattern"))
        .collect()
});

/// Trimmed, lowercased, de-duplicated and sorted; blanks dropped.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn derive_is_remote(title: &str, location: Option<&str>, tags: &[String]) -> bool {
    let haystack = format!("{} {} {}", title, location.unwrap_or_default(), tags.join(" ")).to_lowercase();
    REMOTE_PATTERNS.iter().any(|p| p.is_match(&haystack))
}
