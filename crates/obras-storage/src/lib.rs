//! Storage module for the obras order-management backend.
//!
//! This module provides abstractions for persistent storage of orders and
//! notifications, supporting different backend implementations such as
//! in-memory or file-based stores. On top of the byte-level backend it
//! offers typed document operations and push-based watch subscriptions so
//! that independent observers see every committed write without polling.

use async_trait::async_trait;
use futures::Stream;
use obras_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::pin::Pin;
use tokio::sync::broadcast;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	/// A requested document does not exist.
	#[error("Not found")]
	NotFound,
	/// The backend denied access to the document.
	#[error("Permission denied: {0}")]
	PermissionDenied(String),
	/// Serialization/deserialization failure.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Failure in the storage backend itself.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Configuration validation failure.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the system. It provides basic key-value operations plus
/// prefix listing for collection reads.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Stores several key/value pairs as one batch.
	///
	/// Backends that can should apply the whole batch atomically; the
	/// default implementation writes sequentially.
	async fn set_many_bytes(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StorageError> {
		for (key, value) in entries {
			self.set_bytes(&key, value).await?;
		}
		Ok(())
	}

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all keys starting with the given prefix.
	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used by the builder to register backends.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// A committed change to one stored document.
#[derive(Debug, Clone)]
pub struct StoreChange {
	/// Namespace of the changed document.
	pub namespace: String,
	/// Id of the changed document within its namespace.
	pub id: String,
	/// True when the document was removed.
	pub removed: bool,
}

/// Capacity of the change broadcast channel. A subscriber that lags this
/// far behind misses changes instead of blocking writers.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed documents with
/// automatic JSON serialization, plus push-based watch subscriptions fed
/// by every committed write.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Change feed for watch subscriptions.
	changes: broadcast::Sender<StoreChange>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
		Self { backend, changes }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	fn publish(&self, namespace: &str, id: &str, removed: bool) {
		// Nobody listening is fine; send only fails then.
		let _ = self.changes.send(StoreChange {
			namespace: namespace.to_string(),
			id: id.to_string(),
			removed,
		});
	}

	/// Stores a serializable document, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes)
			.await?;
		self.publish(namespace, id, false);
		Ok(())
	}

	/// Retrieves and deserializes a document from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves every document in a namespace.
	///
	/// A document that disappears between the listing and the read is
	/// skipped rather than failing the whole collection read.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.list_keys(&prefix).await?;
		let mut docs = Vec::with_capacity(keys.len());
		for key in keys {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => {
					let doc = serde_json::from_slice(&bytes)
						.map_err(|e| StorageError::Serialization(e.to_string()))?;
					docs.push(doc);
				}
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(docs)
	}

	/// Updates an existing document in storage.
	///
	/// Returns `NotFound` if the document doesn't exist, making it
	/// semantically different from `store` which will create or overwrite.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await?;
		self.publish(namespace, id, false);
		Ok(())
	}

	/// Updates a batch of documents in one backend write.
	///
	/// Every id must already exist. The mutator is applied to each
	/// document and the whole batch is handed to the backend at once, so
	/// backends with batch support apply it all-or-nothing.
	pub async fn update_batch<T, F>(
		&self,
		namespace: &str,
		ids: &[String],
		mut mutator: F,
	) -> Result<(), StorageError>
	where
		T: Serialize + DeserializeOwned,
		F: FnMut(&mut T),
	{
		let mut entries = Vec::with_capacity(ids.len());
		for id in ids {
			let mut doc: T = self.retrieve(namespace, id).await?;
			mutator(&mut doc);
			let bytes = serde_json::to_vec(&doc)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;
			entries.push((Self::key(namespace, id), bytes));
		}
		self.backend.set_many_bytes(entries).await?;
		for id in ids {
			self.publish(namespace, id, false);
		}
		Ok(())
	}

	/// Removes a document from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await?;
		self.publish(namespace, id, true);
		Ok(())
	}

	/// Checks if a document exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Watches one document, yielding a snapshot after every committed
	/// write.
	///
	/// The stream starts with the current state (`None` if absent) and
	/// then yields again whenever the document changes; `None` marks a
	/// deletion. Each subscriber holds its own receiver; observers never
	/// share a cache.
	pub fn watch<T: DeserializeOwned + Send + 'static>(
		&self,
		namespace: &str,
		id: &str,
	) -> Pin<Box<dyn Stream<Item = Option<T>> + Send + '_>> {
		let namespace = namespace.to_string();
		let id = id.to_string();
		let mut rx = self.changes.subscribe();
		Box::pin(async_stream::stream! {
			yield self.retrieve(&namespace, &id).await.ok();
			loop {
				match rx.recv().await {
					Ok(change) if change.namespace == namespace && change.id == id => {
						if change.removed {
							yield None;
						} else {
							yield self.retrieve(&namespace, &id).await.ok();
						}
					}
					Ok(_) => continue,
					Err(broadcast::error::RecvError::Lagged(missed)) => {
						tracing::warn!(namespace = %namespace, id = %id, missed, "Watch lagged; resyncing");
						yield self.retrieve(&namespace, &id).await.ok();
					}
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		})
	}

	/// Watches a whole namespace, yielding the full collection snapshot
	/// after every committed write to any document in it.
	pub fn watch_namespace<T: DeserializeOwned + Send + 'static>(
		&self,
		namespace: &str,
	) -> Pin<Box<dyn Stream<Item = Vec<T>> + Send + '_>> {
		let namespace = namespace.to_string();
		let mut rx = self.changes.subscribe();
		Box::pin(async_stream::stream! {
			if let Ok(docs) = self.retrieve_all(&namespace).await {
				yield docs;
			}
			loop {
				match rx.recv().await {
					Ok(change) if change.namespace == namespace => {
						if let Ok(docs) = self.retrieve_all(&namespace).await {
							yield docs;
						}
					}
					Ok(_) => continue,
					Err(broadcast::error::RecvError::Lagged(missed)) => {
						tracing::warn!(namespace = %namespace, missed, "Watch lagged; resyncing");
						if let Ok(docs) = self.retrieve_all(&namespace).await {
							yield docs;
						}
					}
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use futures::StreamExt;
	use serde::Deserialize;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Doc {
		name: String,
		read: bool,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn typed_roundtrip_and_update() {
		let storage = service();
		let doc = Doc {
			name: "a".into(),
			read: false,
		};

		storage.store("notifications", "n1", &doc).await.unwrap();
		let loaded: Doc = storage.retrieve("notifications", "n1").await.unwrap();
		assert_eq!(loaded, doc);

		// update requires existence
		let missing = storage.update("notifications", "n2", &doc).await;
		assert!(matches!(missing, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn retrieve_all_reads_the_namespace() {
		let storage = service();
		for i in 0..3 {
			let doc = Doc {
				name: format!("doc-{}", i),
				read: false,
			};
			storage
				.store("notifications", &format!("n{}", i), &doc)
				.await
				.unwrap();
		}
		storage
			.store(
				"orders",
				"o1",
				&Doc {
					name: "other".into(),
					read: false,
				},
			)
			.await
			.unwrap();

		let docs: Vec<Doc> = storage.retrieve_all("notifications").await.unwrap();
		assert_eq!(docs.len(), 3);
	}

	#[tokio::test]
	async fn update_batch_applies_mutator_to_every_doc() {
		let storage = service();
		let ids: Vec<String> = (0..4).map(|i| format!("n{}", i)).collect();
		for id in &ids {
			storage
				.store(
					"notifications",
					id,
					&Doc {
						name: id.clone(),
						read: false,
					},
				)
				.await
				.unwrap();
		}

		storage
			.update_batch::<Doc, _>("notifications", &ids, |doc| doc.read = true)
			.await
			.unwrap();

		let docs: Vec<Doc> = storage.retrieve_all("notifications").await.unwrap();
		assert!(docs.iter().all(|d| d.read));
	}

	#[tokio::test]
	async fn watch_yields_initial_and_updated_snapshots() {
		let storage = service();
		let doc = Doc {
			name: "v1".into(),
			read: false,
		};
		storage.store("orders", "o1", &doc).await.unwrap();

		let mut watch = storage.watch::<Doc>("orders", "o1");
		let first = watch.next().await.unwrap();
		assert_eq!(first.unwrap().name, "v1");

		let updated = Doc {
			name: "v2".into(),
			read: false,
		};
		storage.update("orders", "o1", &updated).await.unwrap();
		let second = watch.next().await.unwrap();
		assert_eq!(second.unwrap().name, "v2");

		storage.remove("orders", "o1").await.unwrap();
		let third = watch.next().await.unwrap();
		assert!(third.is_none());
	}

	#[tokio::test]
	async fn namespace_watchers_are_independent() {
		let storage = service();
		let mut a = storage.watch_namespace::<Doc>("orders");
		let mut b = storage.watch_namespace::<Doc>("orders");
		assert!(a.next().await.unwrap().is_empty());
		assert!(b.next().await.unwrap().is_empty());

		storage
			.store(
				"orders",
				"o1",
				&Doc {
					name: "x".into(),
					read: false,
				},
			)
			.await
			.unwrap();

		assert_eq!(a.next().await.unwrap().len(), 1);
		assert_eq!(b.next().await.unwrap().len(), 1);
	}
}
