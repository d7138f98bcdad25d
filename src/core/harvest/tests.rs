use super::*;
use crate::catalog::JobCatalog;
use crate::drivers::{MockDriver, MockPage};
use crate::parser::{Candidate, ExtractionRules, FieldRule};
use crate::sources::{self, ListingTemplate, PlaceholderEncoding};
use crate::storage::{InMemoryStore, JobStore};
use std::sync::Arc;
use std::time::Duration;

fn board(page_size: usize, max_pages: usize) -> SourceProfile {
    SourceProfile {
        id: "board".to_string(),
        page_size,
        max_pages,
        default_query: None,
        default_location: None,
        listing: ListingTemplate {
            with_location: "https://jobs.example.com/search?q={query}&where={location}&page={page}"
                .to_string(),
            without_location: "https://jobs.example.com/search?q={query}&page={page}".to_string(),
            first_page: 1,
            encoding: PlaceholderEncoding::Form,
        },
        rules: ExtractionRules {
            results: "div.job".to_string(),
            job_url: FieldRule::new(vec![Candidate::attr("a.title", "href")]),
            title: FieldRule::new(vec![Candidate::text("a.title")]),
            company: FieldRule::new(vec![Candidate::text(".company")]),
            location: FieldRule::new(vec![Candidate::text(".location")]),
            salary: FieldRule::new(vec![Candidate::text(".salary")]),
            posted: FieldRule::new(vec![Candidate::text(".posted")]).with_default("today"),
            tags: FieldRule::new(vec![Candidate::text("ul.tags li")]),
        },
    }
}

fn card(id: usize) -> String {
    format!(
        r#"<div class="job">
            <a class="title" href="/jobs/{id}">Rust Engineer {id}</a>
            <span class="company">Ferrous</span>
            <span class="location">Pune</span>
            <span class="salary">10-20 LPA</span>
            <span class="posted">2 days ago</span>
            <ul class="tags"><li>Rust</li><li>Tokio</li></ul>
        </div>"#
    )
}

fn page(ids: std::ops::Range<usize>) -> MockPage {
    let cards: String = ids.map(card).collect();
    MockPage::Html(format!("<html><body>{}</body></html>", cards))
}

fn config() -> HarvestConfig {
    HarvestConfig::default()
        .with_rate(1000.0, None)
        .with_ready_timeout(Duration::from_secs(2), Duration::from_millis(100))
}

async fn run(
    source: SourceProfile,
    driver: MockDriver,
    limit: usize,
) -> (Vec<JobPosting>, HarvestSnapshot) {
    let scraper = JobScraper::new(driver, source, &config()).unwrap();
    let stats = scraper.stats();
    let postings = scraper.harvest("rust", limit, None).collect::<Vec<_>>().await;
    (postings, stats.get_stats())
}

#[test]
fn test_compose_query() {
    assert_eq!(compose_query(Some("Acme"), Some("rust developer")), "Acme rust developer");
    assert_eq!(compose_query(None, Some(" rust ")), "rust");
    assert_eq!(compose_query(Some("Acme"), None), "Acme");
    assert_eq!(compose_query(Some(" "), None), "");
    assert_eq!(compose_query(None, None), "");
}

#[tokio::test(start_paused = true)]
async fn test_limit_spans_two_pages() {
    let driver = MockDriver::new(vec![page(0..3), page(3..6), page(6..9)]);
    let handle = driver.handle();

    let (postings, stats) = run(board(3, 10), driver, 5).await;

    assert_eq!(postings.len(), 5);
    assert_eq!(handle.navigation_count(), 2);
    assert_eq!(postings[4].title, "Rust Engineer 4");
    assert_eq!(stats.stop_reason.as_deref(), Some("limit reached"));
    assert_eq!(handle.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_linkedin_pages_by_offset() {
    let linkedin_card = |i: usize| {
        format!(
            r#"<li><a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/{i}"></a>
               <h3 class="base-search-card__title">Engineer {i}</h3>
               <h4 class="base-search-card__subtitle">Acme</h4>
               <span class="job-search-card__location">Bengaluru</span>
               <time datetime="2024-05-01">1 week ago</time></li>"#
        )
    };
    let linkedin_page = |ids: std::ops::Range<usize>| {
        let cards: String = ids.map(linkedin_card).collect();
        MockPage::Html(format!(
            r#"<html><body><ul class="jobs-search__results-list">{}</ul></body></html>"#,
            cards
        ))
    };
    let driver = MockDriver::new(vec![linkedin_page(0..25), linkedin_page(25..50)]);
    let handle = driver.handle();

    let (postings, _) = run(sources::linkedin(), driver, 30).await;

    assert_eq!(postings.len(), 30);
    let navigations = handle.navigations();
    assert_eq!(navigations.len(), 2);
    assert!(navigations[0].as_str().ends_with("start=0"));
    assert!(navigations[1].as_str().ends_with("start=25"));
    assert!(postings.iter().all(|p| p.source == "linkedin"));
    assert_eq!(postings[29].job_url.as_str(), "https://www.linkedin.com/jobs/view/29");
}

#[tokio::test(start_paused = true)]
async fn test_short_page_is_last() {
    let driver = MockDriver::new(vec![page(0..3), page(3..5), page(5..8)]);
    let handle = driver.handle();

    let (postings, stats) = run(board(3, 10), driver, 100).await;

    assert_eq!(postings.len(), 5);
    assert_eq!(handle.navigation_count(), 2);
    assert_eq!(stats.stop_reason.as_deref(), Some("short page"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_first_page() {
    let driver = MockDriver::new(vec![MockPage::Html("<html><body></body></html>".into())]);
    let handle = driver.handle();

    let (postings, stats) = run(board(3, 10), driver, 10).await;

    assert!(postings.is_empty());
    assert_eq!(handle.navigation_count(), 1);
    assert_eq!(stats.stop_reason.as_deref(), Some("no results on page"));
    assert_eq!(handle.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_earlier_postings() {
    // Only one page scripted: every later navigation fails.
    let driver = MockDriver::new(vec![page(0..3)]);
    let handle = driver.handle();

    let (postings, stats) = run(board(3, 10), driver, 10).await;

    assert_eq!(postings.len(), 3);
    assert_eq!(handle.navigation_count(), 4);
    assert_eq!(stats.stop_reason.as_deref(), Some("page fetch failed"));
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.retry_count, 2);
    assert_eq!(handle.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_page_retried_after_navigation_failure() {
    let driver = MockDriver::new(vec![
        MockPage::NavigationFails("connection reset".into()),
        page(0..2),
    ]);
    let handle = driver.handle();

    let (postings, stats) = run(board(3, 10), driver, 10).await;

    assert_eq!(postings.len(), 2);
    assert_eq!(handle.navigation_count(), 2);
    assert_eq!(stats.retry_count, 1);
    assert_eq!(stats.pages_fetched, 1);
}

#[tokio::test(start_paused = true)]
async fn test_page_ceiling() {
    let driver = MockDriver::new(vec![page(0..3), page(3..6), page(6..9)]);
    let handle = driver.handle();

    let (postings, stats) = run(board(3, 2), driver, 100).await;

    assert_eq!(postings.len(), 6);
    assert_eq!(handle.navigation_count(), 2);
    assert_eq!(stats.stop_reason.as_deref(), Some("page ceiling reached"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_element_is_skipped() {
    let html = format!(
        r#"<html><body>{}<div class="job"><span class="company">No link</span></div>{}</body></html>"#,
        card(1),
        card(2)
    );
    let driver = MockDriver::new(vec![MockPage::Html(html)]);

    let (postings, stats) = run(board(5, 10), driver, 10).await;

    assert_eq!(postings.len(), 2);
    assert_eq!(stats.elements_seen, 3);
    assert_eq!(stats.elements_skipped, 1);
    assert_eq!(stats.postings_emitted, 2);
    assert_eq!(postings[1].job_url.as_str(), "https://jobs.example.com/jobs/2");
}

#[tokio::test(start_paused = true)]
async fn test_postings_are_normalized() {
    let driver = MockDriver::new(vec![page(0..1)]);

    let (postings, _) = run(board(3, 10), driver, 10).await;

    let posting = &postings[0];
    assert_eq!(posting.company, "Ferrous");
    assert_eq!(posting.salary_min, Some(1_000_000));
    assert_eq!(posting.salary_max, Some(2_000_000));
    assert_eq!(posting.currency.as_deref(), Some("INR"));
    assert!(posting.tags.contains(&"rust".to_string()));
    assert!(posting.tags.contains(&"source:board".to_string()));
    assert!(posting.tags.contains(&"query:rust".to_string()));
    assert!(!posting.is_remote);
}

#[tokio::test(start_paused = true)]
async fn test_zero_limit_fetches_nothing() {
    let driver = MockDriver::new(vec![page(0..3)]);
    let handle = driver.handle();

    let (postings, _) = run(board(3, 10), driver, 0).await;

    assert!(postings.is_empty());
    assert_eq!(handle.navigation_count(), 0);
    assert_eq!(handle.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_limit_is_capped() {
    let pages = (0..5).map(|p| page(p * 250..(p + 1) * 250)).collect();
    let driver = MockDriver::new(pages);
    let handle = driver.handle();

    let (postings, _) = run(board(250, 10), driver, 5000).await;

    assert_eq!(postings.len(), MAX_HARVEST_LIMIT);
    assert_eq!(handle.navigation_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_driver_closed_when_stream_dropped() {
    let driver = MockDriver::new(vec![page(0..3), page(3..6)]);
    let handle = driver.handle();
    let scraper = JobScraper::new(driver, board(3, 10), &config()).unwrap();

    {
        let mut postings = Box::pin(scraper.harvest("rust", 10, None));
        assert!(postings.next().await.is_some());
        assert_eq!(handle.close_count(), 0);
    }
    tokio::task::yield_now().await;

    assert_eq!(handle.close_count(), 1);
    assert_eq!(handle.navigation_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_query_stops_harvest() {
    let driver = MockDriver::new(vec![page(0..3)]);
    let handle = driver.handle();
    let scraper = JobScraper::new(driver, board(3, 10), &config()).unwrap();

    let postings = scraper.harvest("  ", 10, None).collect::<Vec<_>>().await;

    assert!(postings.is_empty());
    assert_eq!(handle.navigation_count(), 0);
    assert_eq!(handle.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_location_selects_template() {
    let driver = MockDriver::new(vec![page(0..1)]);
    let handle = driver.handle();
    let scraper = JobScraper::new(driver, board(3, 10), &config()).unwrap();

    let postings = scraper
        .harvest("rust dev", 10, Some("Pune, India"))
        .collect::<Vec<_>>()
        .await;

    assert_eq!(postings.len(), 1);
    assert_eq!(
        handle.navigations()[0].as_str(),
        "https://jobs.example.com/search?q=rust+dev&where=Pune%2C+India&page=1"
    );
    assert!(postings[0].tags.contains(&"search_location:pune, india".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_failing_source_does_not_stop_others() {
    let mut broken = board(3, 10);
    broken.id = "broken".to_string();
    broken.rules.results = "div[".to_string();

    let results = harvest_sources(
        vec![board(3, 10), broken],
        |_| Ok(MockDriver::new(vec![page(0..2)])),
        &config(),
        "rust",
        10,
        None,
    )
    .await;

    assert_eq!(results.len(), 2);
    let ok = results.iter().find(|r| r.source == "board").unwrap();
    assert_eq!(ok.postings.len(), 2);
    assert!(ok.error.is_none());
    assert_eq!(ok.stats.as_ref().unwrap().postings_emitted, 2);
    let failed = results.iter().find(|r| r.source == "broken").unwrap();
    assert!(failed.postings.is_empty());
    assert!(failed.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_harvested_tags_counted_once_per_posting() {
    let driver = MockDriver::new(vec![page(0..3)]);
    let (postings, _) = run(board(5, 10), driver, 10).await;

    let store: Arc<dyn JobStore> = Arc::new(InMemoryStore::new());
    let catalog = JobCatalog::new(store.clone());
    let first = catalog.insert_many(&postings).await.unwrap();
    let again = catalog.insert_many(&postings).await.unwrap();

    assert_eq!(first.inserted, 3);
    assert_eq!(again.duplicates, 3);
    assert_eq!(store.get_tag("rust").await.unwrap().unwrap().count, 3);
    assert_eq!(store.get_tag("source:board").await.unwrap().unwrap().count, 3);

    let purged = catalog
        .purge_older_than(chrono::Utc::now() + chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(purged, 3);
    assert_eq!(store.get_tag("rust").await.unwrap().unwrap().count, 0);
}
