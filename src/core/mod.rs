pub mod config;
mod errors;
pub mod fetcher;
pub mod harvest;
pub mod paginator;
pub mod rate_limit;
pub mod retry;

pub use config::{HarvestConfig, StoreConfig};
pub use errors::{HarvestError, HarvestResult};
pub use fetcher::{FetchError, FetchReport, PageFetcher};
pub use harvest::{compose_query, harvest_sources, JobScraper, SourceHarvest, MAX_HARVEST_LIMIT};
pub use paginator::{PageCursor, Paginator, StopReason};
pub use rate_limit::TokenBucket;
