use super::base::{JobStore, StorageError};
use super::file::FileStore;
use super::memory::InMemoryStore;
#[cfg(feature = "mongodb")]
use super::mongo::MongoStore;
use crate::core::StoreConfig;
#[cfg(not(feature = "mongodb"))]
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

pub enum StoreType {
    /// Lives as long as the process.
    Memory,
    File(PathBuf),
    #[cfg(feature = "mongodb")]
    Mongo(StoreConfig),
}

impl StoreType {
    /// MongoDB when a URI is configured and the `mongodb` feature is built
    /// in; the JSON data file otherwise.
    pub fn from_config(config: &StoreConfig) -> Self {
        match &config.mongodb_uri {
            #[cfg(feature = "mongodb")]
            Some(_) => StoreType::Mongo(config.clone()),
            #[cfg(not(feature = "mongodb"))]
            Some(_) => {
                warn!(
                    "MONGODB_URI is set but this build lacks the mongodb feature; using {}",
                    config.data_file.display()
                );
                StoreType::File(config.data_file.clone())
            }
            None => StoreType::File(config.data_file.clone()),
        }
    }
}

pub async fn create_store(store_type: StoreType) -> Result<Arc<dyn JobStore>, StorageError> {
    match store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreType::File(path) => Ok(Arc::new(FileStore::open(path)?)),
        #[cfg(feature = "mongodb")]
        StoreType::Mongo(config) => Ok(Arc::new(MongoStore::connect(&config).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store() {
        let store = create_store(StoreType::Memory).await.unwrap();
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_data_file_without_uri() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_file: dir.path().join("jobs.json"),
            ..StoreConfig::default()
        };

        let store_type = StoreType::from_config(&config);
        assert!(matches!(&store_type, StoreType::File(path) if path == &config.data_file));

        let store = create_store(store_type).await.unwrap();
        assert!(store.ping().await.is_ok());
    }
}
