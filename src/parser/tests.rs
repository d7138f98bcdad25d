use super::*;
use crate::drivers::{select_document, PageElement};
use url::Url;

fn rules() -> ExtractionRules {
    ExtractionRules {
        results: "div.job".to_string(),
        job_url: FieldRule::new(vec![
            Candidate::attr("a.primary", "href"),
            Candidate::attr("a[href*='/job/']", "href"),
        ]),
        title: FieldRule::new(vec![Candidate::text("h2.title"), Candidate::text("h2")]),
        company: FieldRule::new(vec![Candidate::text("span.company")]).with_slug(
            SlugFallback::LeadingWords {
                skip: 2,
                stop_words: vec!["pune".to_string(), "remote".to_string()],
            },
        ),
        location: FieldRule::new(vec![Candidate::text("span.location")]).with_slug(
            SlugFallback::KnownWords {
                words: vec!["pune".to_string(), "remote".to_string()],
            },
        ),
        salary: FieldRule::new(vec![Candidate::text("span.salary")]),
        posted: FieldRule::new(vec![Candidate::attr_or_text("time", "datetime")])
            .with_default("today"),
        tags: FieldRule::new(vec![Candidate::text("ul.tags li"), Candidate::text("span.skill")]),
    }
}

fn page_url() -> Url {
    Url::parse("https://jobs.example.com/search?q=rust&page=2").unwrap()
}

fn card(html: &str) -> PageElement {
    select_document(html, "div.job").unwrap().remove(0)
}

#[test]
fn test_full_card() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(
        r#"<div class="job">
            <a class="primary" href="https://jobs.example.com/job/1">open</a>
            <h2 class="title"> Rust Engineer </h2>
            <span class="company">Ferrous Ltd</span>
            <span class="location">Berlin</span>
            <span class="salary">50k-70k</span>
            <time datetime="2024-05-01T10:00:00Z">3 days ago</time>
            <ul class="tags"><li>Rust</li><li> Tokio </li><li></li></ul>
        </div>"#,
    );

    let raw = extractor.extract(&element, Some(&page_url())).unwrap();

    assert_eq!(raw.job_url.as_str(), "https://jobs.example.com/job/1");
    assert_eq!(raw.title, "Rust Engineer");
    assert_eq!(raw.company, "Ferrous Ltd");
    assert_eq!(raw.location.as_deref(), Some("Berlin"));
    assert_eq!(raw.salary.as_deref(), Some("50k-70k"));
    assert_eq!(raw.posted.as_deref(), Some("2024-05-01T10:00:00Z"));
    assert_eq!(raw.tags, vec!["Rust", "Tokio"]);
}

#[test]
fn test_later_candidate_used_when_earlier_is_empty() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(
        r#"<div class="job">
            <a href="/job/7">open</a>
            <h2 class="title">   </h2>
            <span class="skill">go</span><span class="skill">grpc</span>
            <time>2 hours ago</time>
        </div>"#,
    );

    let raw = extractor.extract(&element, Some(&page_url())).unwrap();

    // h2.title matched but was blank, so the bare h2 candidate is tried and
    // is blank too.
    assert_eq!(raw.title, "");
    assert_eq!(raw.job_url.as_str(), "https://jobs.example.com/job/7");
    assert_eq!(raw.posted.as_deref(), Some("2 hours ago"));
    assert_eq!(raw.tags, vec!["go", "grpc"]);
}

#[test]
fn test_unmatched_fields_are_absent_not_errors() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(r#"<div class="job"><a class="primary" href="/job/2">x</a></div>"#);

    let raw = extractor.extract(&element, Some(&page_url())).unwrap();

    assert_eq!(raw.title, "");
    assert_eq!(raw.company, "");
    assert_eq!(raw.location, None);
    assert_eq!(raw.salary, None);
    assert_eq!(raw.posted.as_deref(), Some("today"));
    assert!(raw.tags.is_empty());
}

#[test]
fn test_slug_fallbacks() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(
        r#"<div class="job">
            <a class="primary" href="/job/job-listings-acme-data-labs-pune-remote-3to5-years-120424">x</a>
        </div>"#,
    );

    let raw = extractor.extract(&element, Some(&page_url())).unwrap();

    assert_eq!(raw.company, "Acme Data Labs");
    assert_eq!(raw.location.as_deref(), Some("Pune, Remote"));
}

#[test]
fn test_slug_stops_at_experience_range_and_id() {
    let url = Url::parse("https://example.com/job-listings-initech-2to4-years-99").unwrap();
    let leading = SlugFallback::LeadingWords {
        skip: 2,
        stop_words: Vec::new(),
    };
    assert_eq!(leading.derive(&url).as_deref(), Some("Initech"));

    let bare = Url::parse("https://example.com/job-listings-12345").unwrap();
    assert_eq!(leading.derive(&bare), None);
}

#[test]
fn test_missing_url_is_an_extraction_fault() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(r#"<div class="job"><h2>Orphan</h2></div>"#);

    let err = extractor.extract(&element, Some(&page_url())).unwrap_err();
    assert_eq!(err, ExtractionError::MissingUrl);
}

#[test]
fn test_relative_url_without_base_is_rejected() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(r#"<div class="job"><a class="primary" href="/job/3">x</a></div>"#);

    let err = extractor.extract(&element, None).unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidUrl { .. }));
}

#[test]
fn test_non_http_url_is_rejected() {
    let extractor = FieldExtractor::new(rules()).unwrap();
    let element = card(r#"<div class="job"><a class="primary" href="javascript:void(0)">x</a></div>"#);

    let err = extractor.extract(&element, Some(&page_url())).unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidUrl { .. }));
}

#[test]
fn test_invalid_selector_rejected_up_front() {
    let mut bad = rules();
    bad.title = FieldRule::new(vec![Candidate::text("h2[")]);

    let err = FieldExtractor::new(bad).unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidRule { ref field, .. } if field == "title"));
}

#[test]
fn test_rules_load_from_json() {
    let json = r#"{
        "results": "li.card",
        "job_url": {"candidates": [{"kind": "attr", "selector": "a", "attribute": "href"}]},
        "title": {"candidates": [{"kind": "text", "selector": "h3"}]},
        "company": {
            "candidates": [],
            "slug": {"kind": "leading_words", "skip": 2, "stop_words": ["pune"]}
        },
        "posted": {"candidates": [{"kind": "attr_or_text", "selector": "time", "attribute": "datetime"}], "default": "today"}
    }"#;

    let rules: ExtractionRules = serde_json::from_str(json).unwrap();

    assert_eq!(rules.results, "li.card");
    assert_eq!(rules.title.candidates, vec![Candidate::text("h3")]);
    assert!(rules.location.candidates.is_empty());
    assert_eq!(rules.posted.default.as_deref(), Some("today"));
    assert!(rules.validate().is_ok());
}

#[test]
fn test_table_row_results() {
    let rules = ExtractionRules {
        results: "tr.job".to_string(),
        job_url: FieldRule::new(vec![Candidate::attr("td.title a", "href")]),
        title: FieldRule::new(vec![Candidate::text("td.title a")]),
        company: FieldRule::new(vec![Candidate::text("td.company")]),
        location: FieldRule::default(),
        salary: FieldRule::default(),
        posted: FieldRule::default(),
        tags: FieldRule::new(vec![Candidate::text("td.skills span")]),
    };
    let extractor = FieldExtractor::new(rules).unwrap();
    let page = r#"<html><body><table>
        <tr class="job">
            <td class="title"><a href="/job/7">Data Engineer</a></td>
            <td class="company">Acme</td>
            <td class="skills"><span>SQL</span><span>Spark</span></td>
        </tr>
    </table></body></html>"#;

    let rows = select_document(page, extractor.results_selector()).unwrap();
    assert_eq!(rows.len(), 1);
    let raw = extractor.extract(&rows[0], Some(&page_url())).unwrap();

    assert_eq!(raw.job_url.as_str(), "https://jobs.example.com/job/7");
    assert_eq!(raw.title, "Data Engineer");
    assert_eq!(raw.company, "Acme");
    assert_eq!(raw.tags, vec!["SQL", "Spark"]);
}
