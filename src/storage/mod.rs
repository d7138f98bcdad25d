pub mod base;
pub mod disk;
pub mod factory;
pub mod file;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod types;

pub use base::{InsertOutcome, JobStore, StorageError};
pub use disk::{export_json, JsonExporter};
pub use factory::{create_store, StoreType};
pub use file::FileStore;
pub use memory::{InMemoryStore, StoreSnapshot};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
pub use types::{PersistReport, SearchFilters};
