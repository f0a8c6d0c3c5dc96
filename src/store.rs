//! Persistence contracts and built-in backends for cached platform key sets.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, jwks::JwksCacheEntry};

/// Boxed future returned by [`JwksBackend`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage contract for key set entries, one per source URL.
pub trait JwksBackend
where
	Self: Send + Sync,
{
	/// Persists or replaces the entry for its source URL.
	fn save(&self, entry: JwksCacheEntry) -> StoreFuture<'_, ()>;

	/// Fetches the entry for `url`, if present.
	fn fetch<'a>(&'a self, url: &'a Url) -> StoreFuture<'a, Option<JwksCacheEntry>>;

	/// Loads every persisted entry.
	fn entries(&self) -> StoreFuture<'_, Vec<JwksCacheEntry>>;

	/// Lists the source URL of every persisted entry.
	fn urls(&self) -> StoreFuture<'_, Vec<Url>> {
		Box::pin(async move {
			let entries = self.entries().await?;

			Ok(entries.into_iter().map(|entry| entry.source_url).collect())
		})
	}
}

/// Error type produced by [`JwksBackend`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
