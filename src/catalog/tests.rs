use super::*;
use crate::models::HarvestMode;
use crate::storage::InMemoryStore;
use url::Url;

fn posting(id: u32, tags: &[&str], days_old: i64) -> JobPosting {
    JobPosting {
        source: "naukri".to_string(),
        mode: HarvestMode::Dynamic,
        title: format!("Engineer {}", id),
        company: "Acme".to_string(),
        location: Some("Pune".to_string()),
        salary: None,
        salary_min: None,
        salary_max: None,
        currency: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        posted_date: Utc::now() - Duration::days(days_old),
        job_url: Url::parse(&format!("https://www.naukri.com/job/{}", id)).unwrap(),
        is_remote: tags.contains(&"remote"),
    }
}

fn catalog() -> (JobCatalog, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (JobCatalog::new(store.clone()), store)
}

async fn count(catalog: &JobCatalog, tag: &str) -> i64 {
    catalog.get_tag(tag).await.unwrap().map_or(0, |r| r.count)
}

#[tokio::test]
async fn test_insert_increments_each_tag_once() {
    let (catalog, _) = catalog();

    let outcome = catalog.insert(&posting(1, &["python", "django"], 0)).await.unwrap();

    assert_eq!(outcome, InsertOutcome::Inserted);
    assert_eq!(count(&catalog, "python").await, 1);
    assert_eq!(count(&catalog, "django").await, 1);
    let python = catalog.get_tag("Python").await.unwrap().unwrap();
    assert_eq!(python.category, TagCategory::Technology);
}

#[tokio::test]
async fn test_duplicate_insert_leaves_counts_alone() {
    let (catalog, _) = catalog();
    let job = posting(1, &["python"], 0);

    catalog.insert(&job).await.unwrap();
    assert_eq!(catalog.insert(&job).await.unwrap(), InsertOutcome::Duplicate);

    assert_eq!(count(&catalog, "python").await, 1);
}

#[tokio::test]
async fn test_tag_replacement_moves_counts() {
    let (catalog, _) = catalog();
    let job = posting(1, &["python", "django"], 0);
    catalog.insert(&job).await.unwrap();

    let updated = catalog
        .update_tags("naukri", job.job_url.as_str(), &["Java".to_string()])
        .await
        .unwrap();

    assert!(updated);
    assert_eq!(count(&catalog, "python").await, 0);
    assert_eq!(count(&catalog, "django").await, 0);
    assert_eq!(count(&catalog, "java").await, 1);
    let stored = catalog
        .store()
        .find_job("naukri", job.job_url.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.tags, vec!["java"]);
}

#[tokio::test]
async fn test_repeated_replacement_never_goes_negative() {
    let (catalog, store) = catalog();
    let job = posting(1, &["python"], 0);
    catalog.insert(&job).await.unwrap();

    // Another writer already took python down to zero.
    store.decrement_tag("python", Utc::now()).await.unwrap();
    for _ in 0..3 {
        catalog
            .update_tags("naukri", job.job_url.as_str(), &["python".to_string()])
            .await
            .unwrap();
        catalog
            .update_tags("naukri", job.job_url.as_str(), &["rust".to_string()])
            .await
            .unwrap();
    }

    assert!(count(&catalog, "python").await >= 0);
    assert_eq!(count(&catalog, "python").await, 0);
    assert_eq!(count(&catalog, "rust").await, 1);
}

#[tokio::test]
async fn test_update_tags_of_unknown_posting() {
    let (catalog, _) = catalog();
    let updated = catalog
        .update_tags("naukri", "https://www.naukri.com/job/404", &["go".to_string()])
        .await
        .unwrap();

    assert!(!updated);
    assert!(catalog.get_tag("go").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_many_reports_outcomes() {
    let (catalog, _) = catalog();
    let jobs = vec![
        posting(1, &["python"], 0),
        posting(2, &["python", "aws"], 0),
        posting(1, &["python"], 0),
    ];

    let report = catalog.insert_many(&jobs).await.unwrap();

    assert_eq!(
        report,
        PersistReport {
            inserted: 2,
            duplicates: 1,
            failed: 0
        }
    );
    assert_eq!(count(&catalog, "python").await, 2);
    assert_eq!(count(&catalog, "aws").await, 1);
}

#[tokio::test]
async fn test_insert_many_stops_when_store_is_down() {
    let (catalog, store) = catalog();
    store.set_available(false);

    let err = catalog
        .insert_many(&[posting(1, &["python"], 0)])
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Unavailable(_)));
}

#[tokio::test]
async fn test_purge_decrements_only_deleted_postings() {
    let (catalog, _) = catalog();
    catalog.insert(&posting(1, &["python", "legacy"], 120)).await.unwrap();
    catalog.insert(&posting(2, &["python"], 1)).await.unwrap();

    let purged = catalog.purge_older_than_days(90).await.unwrap();

    assert_eq!(purged, 1);
    assert_eq!(count(&catalog, "python").await, 1);
    assert_eq!(count(&catalog, "legacy").await, 0);
    assert_eq!(catalog.count_matching(&SearchFilters::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_huge_day_windows_do_not_overflow() {
    let (catalog, _) = catalog();
    catalog.insert(&posting(1, &["python"], 400)).await.unwrap();

    assert_eq!(catalog.purge_older_than_days(1_000_000_000).await.unwrap(), 0);
    assert_eq!(catalog.purge_older_than_days(i64::MAX).await.unwrap(), 0);
    assert_eq!(catalog.recent_tags(i64::MAX, 10).await.unwrap().len(), 1);
    assert_eq!(count(&catalog, "python").await, 1);

    let now = Utc::now();
    assert_eq!(days_before(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
    assert_eq!(days_before(now, -3), now);
}

#[tokio::test]
async fn test_search_interface() {
    let (catalog, _) = catalog();
    catalog.insert(&posting(1, &["python", "remote"], 3)).await.unwrap();
    catalog.insert(&posting(2, &["java"], 1)).await.unwrap();
    catalog.insert(&posting(3, &["python", "senior"], 2)).await.unwrap();

    let python = SearchFilters {
        tags: vec!["PYTHON".to_string()],
        ..SearchFilters::default()
    };
    assert_eq!(catalog.count_matching(&python).await.unwrap(), 2);

    let found = catalog.find_matching(&python, 10, 0).await.unwrap();
    let titles: Vec<&str> = found.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Engineer 3", "Engineer 1"]);

    let top = catalog.top_tags(2, None).await.unwrap();
    assert_eq!(top[0].tag, "python");
    assert_eq!(top[0].count, 2);

    let technology = catalog.top_tags(10, Some(TagCategory::Technology)).await.unwrap();
    let names: Vec<&str> = technology.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(names, vec!["python", "java"]);

    let grouped = catalog.tags_by_category().await.unwrap();
    assert_eq!(grouped[&TagCategory::Experience][0].tag, "senior");
    assert_eq!(grouped[&TagCategory::Location][0].tag, "remote");
    assert_eq!(grouped[&TagCategory::Technology].len(), 2);
}

#[tokio::test]
async fn test_tag_lookup_helpers() {
    let (catalog, _) = catalog();
    catalog.insert(&posting(1, &["python", "pytorch", "go"], 0)).await.unwrap();
    catalog.insert(&posting(2, &["python"], 0)).await.unwrap();

    let found = catalog.search_tags("PY", 10).await.unwrap();
    let names: Vec<&str> = found.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(names, vec!["python", "pytorch"]);

    assert_eq!(catalog.recent_tags(7, 2).await.unwrap().len(), 2);

    let synonyms = vec!["golang".to_string()];
    assert!(catalog
        .update_tag_metadata("Go", Some(TagCategory::Technology), Some(&synonyms))
        .await
        .unwrap());
    let go = catalog.get_tag("go").await.unwrap().unwrap();
    assert_eq!(go.category, TagCategory::Technology);
    assert_eq!(go.synonyms, synonyms);
    assert!(!catalog.update_tag_metadata("missing", None, None).await.unwrap());
}

#[tokio::test]
async fn test_statistics() {
    let (catalog, _) = catalog();
    catalog.insert(&posting(1, &["python", "remote"], 0)).await.unwrap();
    catalog.insert(&posting(2, &["java"], 30)).await.unwrap();

    let jobs = catalog.job_statistics().await.unwrap();
    assert_eq!(jobs.total_jobs, 2);
    assert_eq!(jobs.remote_jobs, 1);
    assert_eq!(jobs.recent_jobs, 1);
    assert_eq!(jobs.jobs_by_source.len(), 1);
    assert_eq!(jobs.jobs_by_source[0].source, "naukri");
    assert_eq!(jobs.jobs_by_source[0].count, 2);

    let tags = catalog.tag_statistics().await.unwrap();
    assert_eq!(tags.total_tags, 3);
    assert_eq!(tags.most_popular_tags.len(), 3);
    assert_eq!(tags.recent_tags.len(), 3);
    // Three tags this week, none the week before.
    assert!((tags.tag_growth_rate - 300.0).abs() < f64::EPSILON);
}
