//! The harvest loop: one scraper, one driver session, one lazy stream of
//! normalized postings.

use crate::core::fetcher::PageFetcher;
use crate::core::paginator::{Paginator, StopReason};
use crate::core::{HarvestConfig, HarvestResult};
use crate::drivers::{Driver, DriverError};
use crate::models::JobPosting;
use crate::normalize::{Normalizer, SearchContext};
use crate::parser::FieldExtractor;
use crate::sources::SourceProfile;
use crate::stats::{HarvestSnapshot, HarvestStats};
use async_stream::stream;
use futures::future;
use futures::stream::{Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::runtime::Handle;

/// Upper bound on postings requested from a single harvest.
pub const MAX_HARVEST_LIMIT: usize = 1000;

/// Search text for a company and/or keyword query.
pub fn compose_query(company: Option<&str>, query: Option<&str>) -> String {
    let parts: Vec<&str> = [company, query]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    parts.join(" ")
}

/// Owns the driver for the lifetime of a harvest and closes it on every exit
/// path. A normal finish closes it in place; a drop (the stream was abandoned
/// or the task panicked) hands the close to the runtime.
struct Session<D: Driver + 'static> {
    driver: Option<D>,
    source: String,
}

impl<D: Driver + 'static> Session<D> {
    fn new(driver: D, source: &str) -> Self {
        Self {
            driver: Some(driver),
            source: source.to_string(),
        }
    }

    fn driver(&mut self) -> Result<&mut D, DriverError> {
        self.driver.as_mut().ok_or(DriverError::Closed)
    }

    async fn close(mut self) {
        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.close().await {
                warn!("Failed to close {} driver session: {}", self.source, e);
            }
        }
    }
}

impl<D: Driver + 'static> Drop for Session<D> {
    fn drop(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        let source = std::mem::take(&mut self.source);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = driver.close().await {
                        warn!("Failed to close {} driver session: {}", source, e);
                    }
                });
            }
            Err(_) => error!("No runtime left to close {} driver session", source),
        }
    }
}

/// Walks one source's result pages with one driver session.
pub struct JobScraper<D: Driver + 'static> {
    driver: D,
    source: SourceProfile,
    fetcher: PageFetcher,
    extractor: FieldExtractor,
    normalizer: Normalizer,
    stats: HarvestStats,
}

impl<D: Driver + 'static> JobScraper<D> {
    pub fn new(driver: D, source: SourceProfile, config: &HarvestConfig) -> HarvestResult<Self> {
        Self::with_stats(driver, source, config, HarvestStats::new())
    }

    pub fn with_stats(
        driver: D,
        source: SourceProfile,
        config: &HarvestConfig,
        stats: HarvestStats,
    ) -> HarvestResult<Self> {
        source.validate()?;
        let extractor = FieldExtractor::new(source.rules.clone())?;
        Ok(Self {
            driver,
            fetcher: PageFetcher::new(config, stats.clone()),
            extractor,
            normalizer: Normalizer::new(config),
            source,
            stats,
        })
    }

    pub fn source(&self) -> &SourceProfile {
        &self.source
    }

    pub fn stats(&self) -> HarvestStats {
        self.stats.clone()
    }

    /// Lazily harvests up to `limit` postings (capped at
    /// [`MAX_HARVEST_LIMIT`]). The scraper is consumed: a finished or dropped
    /// stream cannot be restarted, and the driver is closed either way.
    pub fn harvest(
        self,
        query: &str,
        limit: usize,
        location: Option<&str>,
    ) -> impl Stream<Item = JobPosting> + Send + 'static {
        let query = query.to_string();
        let location = location.map(str::to_string);
        let JobScraper {
            driver,
            source,
            fetcher,
            extractor,
            normalizer,
            stats,
        } = self;

        stream! {
            let mut session = Session::new(driver, &source.id);
            let context = SearchContext::new(&source.id, &query, location.as_deref());
            let mut pager = Paginator::new(
                source.page_size,
                source.max_pages,
                limit.min(MAX_HARVEST_LIMIT),
            );
            info!(
                "Harvesting {} for {:?} in {:?} (limit {})",
                source.id,
                query,
                location,
                limit.min(MAX_HARVEST_LIMIT)
            );

            while !pager.is_finished() {
                let cursor = pager.cursor();
                let url = match source.listing_url(&query, location.as_deref(), &cursor) {
                    Ok(url) => url,
                    Err(e) => {
                        error!("Cannot build {} listing URL: {}", source.id, e);
                        pager.fetch_failed();
                        break;
                    }
                };
                let driver = match session.driver() {
                    Ok(driver) => driver,
                    Err(e) => {
                        error!("{} driver unavailable: {}", source.id, e);
                        pager.fetch_failed();
                        break;
                    }
                };

                if let Err(e) = fetcher.fetch(driver, &url).await {
                    warn!("Failed to fetch {} page {}: {}", source.id, cursor.index + 1, e);
                    pager.fetch_failed();
                    break;
                }

                let elements = match driver.query(extractor.results_selector()).await {
                    Ok(elements) => elements,
                    Err(e) => {
                        warn!("Failed to list results on {}: {}", url, e);
                        pager.fetch_failed();
                        break;
                    }
                };
                stats.record_elements(elements.len());
                if pager.page_loaded(elements.len()).is_some() {
                    info!("No more {} results at page {}", source.id, cursor.index + 1);
                    break;
                }

                debug!("{} page {}: {} result elements", source.id, cursor.index + 1, elements.len());
                for element in &elements {
                    match extractor.extract(element, Some(&url)) {
                        Ok(raw) => {
                            let posting = normalizer.normalize(raw, &context);
                            stats.record_emit();
                            yield posting;
                            if pager.record_produced() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Skipping {} result element: {}", source.id, e);
                            stats.record_skip();
                        }
                    }
                }

                pager.page_done(elements.len());
            }

            let reason = pager.stop_reason().unwrap_or(StopReason::LimitReached);
            info!(
                "Finished {} harvest with {} posting(s): {}",
                source.id,
                pager.produced(),
                reason
            );
            stats.record_stop(reason.to_string());
            stats.finish();
            session.close().await;
        }
    }
}

/// Result of one source's run inside [`harvest_sources`].
#[derive(Debug, Clone)]
pub struct SourceHarvest {
    pub source: String,
    pub postings: Vec<JobPosting>,
    pub stats: Option<HarvestSnapshot>,
    /// Set when the source never started or its task died.
    pub error: Option<String>,
}

/// Harvests every source concurrently, one task and one driver per source.
/// A source that fails stops only itself.
pub async fn harvest_sources<D, F>(
    sources: Vec<SourceProfile>,
    mut make_driver: F,
    config: &HarvestConfig,
    query: &str,
    limit: usize,
    location: Option<&str>,
) -> Vec<SourceHarvest>
where
    D: Driver + 'static,
    F: FnMut(&SourceProfile) -> HarvestResult<D>,
{
    let mut outcomes = Vec::new();
    let mut tasks = Vec::new();

    for source in sources {
        let id = source.id.clone();
        let scraper = make_driver(&source)
            .and_then(|driver| JobScraper::new(driver, source, config));
        let scraper = match scraper {
            Ok(scraper) => scraper,
            Err(e) => {
                error!("Could not start {} harvest: {}", id, e);
                outcomes.push(SourceHarvest {
                    source: id,
                    postings: Vec::new(),
                    stats: None,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let stats = scraper.stats();
        let postings = scraper.harvest(query, limit, location);
        tasks.push((
            id,
            stats,
            tokio::spawn(async move { postings.collect::<Vec<_>>().await }),
        ));
    }

    let (meta, handles): (Vec<_>, Vec<_>) = tasks
        .into_iter()
        .map(|(id, stats, handle)| ((id, stats), handle))
        .unzip();
    let results = future::join_all(handles).await;

    for ((id, stats), result) in meta.into_iter().zip(results) {
        match result {
            Ok(postings) => outcomes.push(SourceHarvest {
                source: id,
                postings,
                stats: Some(stats.get_stats()),
                error: None,
            }),
            Err(e) => {
                error!("{} harvest task failed: {}", id, e);
                outcomes.push(SourceHarvest {
                    source: id,
                    postings: Vec::new(),
                    stats: Some(stats.get_stats()),
                    error: Some(format!("Task failed: {}", e)),
                });
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests;
