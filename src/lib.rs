pub mod catalog;
pub mod core;
pub mod drivers;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod sources;
pub mod stats;
pub mod storage;

pub use catalog::{JobCatalog, TagIndex};
pub use core::{
    compose_query, harvest_sources, HarvestConfig, HarvestError, HarvestResult, JobScraper,
    StoreConfig, MAX_HARVEST_LIMIT,
};
pub use drivers::{Driver, HttpDriver, MockDriver};
pub use models::{HarvestMode, JobPosting, TagCategory, TagRecord};
pub use sources::SourceProfile;
pub use stats::HarvestStats;
pub use storage::{JobStore, SearchFilters};
