// Key-value persistence used by every service. In-memory by default, Redis when configured.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub mod locks;
pub mod memory;
pub mod redis;

pub use locks::KeyLocks;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Store backend failed: {0}")]
    Backend(String),
}

/// Durable map from string key to JSON value.
///
/// `get_by_prefix` returns values in no particular order; callers sort where
/// order matters.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;
    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<Value>, StoreError>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Typed helpers over the raw JSON contract.
#[async_trait::async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + Sync,
    {
        self.set(key, serde_json::to_value(value)?).await
    }

    async fn list_json<T>(&self, prefix: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let mut out = Vec::new();
        for value in self.get_by_prefix(prefix).await? {
            match serde_json::from_value(value) {
                Ok(item) => out.push(item),
                Err(e) => tracing::warn!(prefix, error = %e, "skipping undecodable record"),
            }
        }
        Ok(out)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Key layout shared by the services.
pub mod keys {
    use uuid::Uuid;

    pub const ORDER_PREFIX: &str = "order:";
    pub const PRODUCT_PREFIX: &str = "product:";
    pub const COUPON_PREFIX: &str = "coupon:";
    pub const CUSTOM_REQUEST_PREFIX: &str = "custom_request:";

    pub fn order(id: Uuid) -> String {
        format!("{ORDER_PREFIX}{id}")
    }

    pub fn product(id: &str) -> String {
        format!("{PRODUCT_PREFIX}{id}")
    }

    pub fn coupon(id: Uuid) -> String {
        format!("{COUPON_PREFIX}{id}")
    }

    pub fn custom_request(id: Uuid) -> String {
        format!("{CUSTOM_REQUEST_PREFIX}{id}")
    }
}

/// Builds the configured backend. An unreachable Redis is a startup error;
/// the store is authoritative, so there is no silent in-memory fallback.
pub async fn create_store(backend: &str, redis_url: &str) -> Result<SharedStore, StoreError> {
    match backend.to_ascii_lowercase().as_str() {
        "redis" => {
            let store = RedisStore::connect(redis_url).await?;
            tracing::info!("using redis key-value store");
            Ok(Arc::new(store))
        }
        "in-memory" => {
            tracing::info!("using in-memory key-value store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        other => Err(StoreError::Backend(format!("unknown store backend: {other}"))),
    }
}
