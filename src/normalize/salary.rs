use regex::Regex;
use std::sync::LazyLock;

/// Checked in order; the first key found decides the currency.
const CURRENCY_TABLE: [(&str, &str); 6] = [
    ("lpa", "INR"),
    ("inr", "INR"),
    ("₹", "INR"),
    ("rs", "INR"),
    ("$", "USD"),
    ("usd", "USD"),
];

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"));
static THOUSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d\s*k\b").expect("valid thousands pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SalaryRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub currency: Option<String>,
}

/// True when `key` occurs in `text` without a letter directly on either side.
/// Symbol keys match anywhere.
fn contains_key(text: &str, key: &str) -> bool {
    if !key.chars().all(|c| c.is_ascii_alphabetic()) {
        return text.contains(key);
    }
    text.match_indices(key).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + key.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphabetic()) && !after.is_some_and(|c| c.is_alphabetic())
    })
}

fn detect_currency(text: &str) -> Option<String> {
    CURRENCY_TABLE
        .iter()
        .find(|(key, _)| contains_key(text, key))
        .map(|(_, code)| code.to_string())
}

/// Parses free salary text such as `"3-7 LPA"`, `"₹10,00,000 - ₹14,00,000"`
/// or `"50k-70k"` into a whole-unit range.
pub fn parse_salary(text: Option<&str>) -> SalaryRange {
    let cleaned = match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_lowercase().replace(',', "").replace("lakhs", "lpa"),
        None => return SalaryRange::default(),
    };

    let currency = detect_currency(&cleaned);
    let numbers: Vec<f64> = NUMBER
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .take(2)
        .collect();
    if numbers.is_empty() {
        return SalaryRange {
            currency,
            ..SalaryRange::default()
        };
    }

    let multiplier = if cleaned.contains("lpa") || cleaned.contains("lakh") {
        100_000.0
    } else if THOUSANDS.is_match(&cleaned) {
        1_000.0
    } else {
        1.0
    };
    let values: Vec<i64> = numbers.iter().map(|n| (n * multiplier) as i64).collect();
    let min = values[0];
    let max = values.get(1).copied().unwrap_or(min);

    SalaryRange {
        min: Some(min),
        max: Some(max),
        currency,
    }
}
