//! Thread-safe in-memory [`JwksBackend`] for tests and deployments without a key directory.

// self
use crate::{
	_prelude::*,
	jwks::JwksCacheEntry,
	store::{JwksBackend, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<Url, JwksCacheEntry>>>;

/// Keeps key set entries in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl JwksBackend for MemoryStore {
	fn save(&self, entry: JwksCacheEntry) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(entry.source_url.clone(), entry);

			Ok(())
		})
	}

	fn fetch<'a>(&'a self, url: &'a Url) -> StoreFuture<'a, Option<JwksCacheEntry>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(url).cloned()) })
	}

	fn entries(&self) -> StoreFuture<'_, Vec<JwksCacheEntry>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().values().cloned().collect()) })
	}
}
