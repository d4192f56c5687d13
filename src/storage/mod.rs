//! Storage abstraction for zone and marker persistence.
//!
//! `KeyValueStore` is the backend seam: anything that can put, get and
//! delete JSON-serializable values by key. `RecordSync` layers unit-scoped
//! zone/marker collections with push notifications on top of it.

mod sync;

pub use sync::{PendingWrite, RecordSync};

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A write could not be completed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An unexpected error occurred.
    #[error("storage error: {0}")]
    Other(String),
}

/// A generic key-value storage interface.
///
/// Implementations can use different backends (in-memory, browser storage,
/// a remote document store) while providing a consistent API.
///
/// Note: This trait does not require `Send` bounds since the engine runs on
/// a single-threaded event loop.
pub trait KeyValueStore {
    /// Stores a value under the given key, overwriting any existing value.
    fn put<T: Serialize + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> impl Future<Output = Result<(), StorageError>>;

    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get<T: DeserializeOwned + 'static>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>, StorageError>>;

    /// Deletes a value by key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>>;
}

pub mod native {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// A simple in-memory store.
    ///
    /// Clones share the same data, so two engines holding clones of one
    /// store behave like two clients of a shared backend. Data is not
    /// persisted across application restarts.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        data: Arc<RwLock<HashMap<String, String>>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl KeyValueStore for MemoryStore {
        async fn put<T: Serialize + 'static>(
            &self,
            key: &str,
            value: &T,
        ) -> Result<(), StorageError> {
            let json = serde_json::to_string(value)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            self.data
                .write()
                .map_err(|e| StorageError::TransactionFailed(e.to_string()))?
                .insert(key.to_string(), json);
            Ok(())
        }

        async fn get<T: DeserializeOwned + 'static>(
            &self,
            key: &str,
        ) -> Result<Option<T>, StorageError> {
            let data = self
                .data
                .read()
                .map_err(|e| StorageError::Other(e.to_string()))?;
            match data.get(key) {
                Some(json) => {
                    let value = serde_json::from_str(json)
                        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.data
                .write()
                .map_err(|e| StorageError::TransactionFailed(e.to_string()))?
                .remove(key);
            Ok(())
        }
    }
}

pub use native::MemoryStore;

#[cfg(test)]
mod tests {
    use super::*;
    use futures_executor::block_on;

    #[test]
    fn test_memory_store_put_get_delete() {
        let store = MemoryStore::new();
        block_on(async {
            store.put("k", &vec![1u32, 2, 3]).await.unwrap();
            let got: Option<Vec<u32>> = store.get("k").await.unwrap();
            assert_eq!(got, Some(vec![1, 2, 3]));

            store.delete("k").await.unwrap();
            store.delete("k").await.unwrap();
            let got: Option<Vec<u32>> = store.get("k").await.unwrap();
            assert_eq!(got, None);
        });
    }

    #[test]
    fn test_clones_share_data() {
        let a = MemoryStore::new();
        let b = a.clone();
        block_on(async {
            a.put("shared", &"x").await.unwrap();
            let got: Option<String> = b.get("shared").await.unwrap();
            assert_eq!(got.as_deref(), Some("x"));
        });
    }

    #[test]
    fn test_type_mismatch_is_serialization_error() {
        let store = MemoryStore::new();
        block_on(async {
            store.put("k", &"text").await.unwrap();
            let got: Result<Option<u32>, _> = store.get("k").await;
            assert!(matches!(got, Err(StorageError::SerializationError(_))));
        });
    }
}
