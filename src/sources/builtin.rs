use super::{ListingTemplate, PlaceholderEncoding, SourceProfile};
use crate::parser::{Candidate, ExtractionRules, FieldRule, SlugFallback};

const NAUKRI_CITIES: [&str; 10] = [
    "bengaluru",
    "mumbai",
    "delhi",
    "pune",
    "chennai",
    "hyderabad",
    "kolkata",
    "noida",
    "gurgaon",
    "remote",
];

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn texts(selectors: &[&str]) -> Vec<Candidate> {
    selectors.iter().map(|s| Candidate::text(s)).collect()
}

pub fn builtin_sources() -> Vec<SourceProfile> {
    vec![linkedin(), naukri()]
}

/// Public LinkedIn job search, paginated with `start=0,25,50,…`.
pub fn linkedin() -> SourceProfile {
    let template =
        "https://www.linkedin.com/jobs/search?keywords={query}&location={location}&start={offset}";

    SourceProfile {
        id: "linkedin".to_string(),
        page_size: 25,
        max_pages: 40,
        default_query: Some("software engineer".to_string()),
        default_location: Some("India".to_string()),
        listing: ListingTemplate {
            with_location: template.to_string(),
            without_location: template.to_string(),
            first_page: 0,
            encoding: PlaceholderEncoding::Form,
        },
        rules: ExtractionRules {
            results: "ul.jobs-search__results-list li".to_string(),
            job_url: FieldRule::new(vec![
                Candidate::attr("a.base-card__full-link", "href"),
                Candidate::attr("a[data-control-name='job_card_click']", "href"),
                Candidate::attr("a[href*='/jobs/view/']", "href"),
                Candidate::attr("a[href*='linkedin.com/jobs']", "href"),
            ]),
            title: FieldRule::new(texts(&[
                "h3.base-search-card__title",
                "h3[data-testid='job-search-card__title']",
                "h3.job-search-card__title",
                "a[data-control-name='job_card_click'] h3",
                "h3",
                "a[href*='/jobs/view/'] h3",
            ])),
            company: FieldRule::new(texts(&[
                "h4.base-search-card__subtitle a",
                "h4.base-search-card__subtitle",
                "span.job-search-card__company-name",
                "a[data-control-name='job_card_company_click']",
                "h4",
            ])),
            location: FieldRule::new(texts(&[
                "span.job-search-card__location",
                "span[data-testid='job-search-card__location']",
                "span.location",
                "li.job-search-card__location",
            ])),
            salary: FieldRule::new(texts(&["span.job-search-card__salary-info"])),
            posted: FieldRule::new(vec![
                Candidate::attr_or_text("time", "datetime"),
                Candidate::text("span.job-search-card__listdate"),
                Candidate::text("span[data-testid='job-search-card__listdate']"),
            ])
            .with_default("today"),
            tags: FieldRule::default(),
        },
    }
}

/// Naukri search, paginated by a 1-based page number in the path.
pub fn naukri() -> SourceProfile {
    let mut known_locations = words(&NAUKRI_CITIES);
    known_locations.extend(words(&["ajmer", "jaipur"]));

    SourceProfile {
        id: "naukri".to_string(),
        page_size: 20,
        max_pages: 20,
        default_query: None,
        default_location: None,
        listing: ListingTemplate {
            with_location:
                "https://www.naukri.com/{query}-jobs-in-{location}-{page}?k={query}&l={location}"
                    .to_string(),
            without_location: "https://www.naukri.com/{query}-jobs-{page}?k={query}".to_string(),
            first_page: 1,
            encoding: PlaceholderEncoding::Slug,
        },
        rules: ExtractionRules {
            results: ".srp-jobtuple-wrapper".to_string(),
            job_url: FieldRule::new(vec![Candidate::attr("h2 a.title", "href")]),
            title: FieldRule::new(texts(&["h2 a.title"])),
            // Listing URLs look like job-listings-{title}-{company}-{city}-{years}-{id}.
            company: FieldRule::new(texts(&["a.comp-name"])).with_slug(
                SlugFallback::LeadingWords {
                    skip: 2,
                    stop_words: words(&NAUKRI_CITIES),
                },
            ),
            location: FieldRule::new(texts(&[
                "span[class*='location']",
                ".location",
                "[class*='location']",
            ]))
            .with_slug(SlugFallback::KnownWords {
                words: known_locations,
            }),
            salary: FieldRule::new(texts(&[
                "span[class*='salary']",
                "div[class*='salary']",
                "span[class*='compensation']",
                "div[class*='compensation']",
            ])),
            posted: FieldRule::new(texts(&[
                "span[class*='date']",
                "div[class*='date']",
                "span[class*='posted']",
                "div[class*='posted']",
                "time",
            ]))
            .with_default("today"),
            tags: FieldRule::new(texts(&["ul.tags li a", "ul.tags-gt li"])),
        },
    }
}
