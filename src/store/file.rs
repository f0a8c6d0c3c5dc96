//! Directory-backed [`JwksBackend`] keeping one JSON file per key set source URL.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	jwks::JwksCacheEntry,
	store::{JwksBackend, StoreError, StoreFuture},
};

const ENTRY_EXTENSION: &str = "json";

/// Persists each entry to `{directory}/{url-encoded source URL}.json`.
///
/// Files are replaced atomically through a temporary sibling, so a crash mid-write leaves the
/// previous key set on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
	directory: PathBuf,
}
impl FileStore {
	/// Opens (or creates) a store rooted at `directory`.
	pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let directory = directory.into();

		fs::create_dir_all(&directory).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", directory.display()),
		})?;

		Ok(Self { directory })
	}

	/// Root directory of the store.
	pub fn directory(&self) -> &Path {
		&self.directory
	}

	/// File holding the entry for `url`.
	pub fn entry_path(&self, url: &Url) -> PathBuf {
		let name: String = url::form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();

		self.directory.join(format!("{name}.{ENTRY_EXTENSION}"))
	}

	fn read_entry(path: &Path) -> Result<Option<JwksCacheEntry>, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn write_entry(&self, entry: &JwksCacheEntry) -> Result<(), StoreError> {
		let path = self.entry_path(&entry.source_url);
		let serialized = serde_json::to_vec_pretty(entry).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize key set for {}: {e}", entry.source_url),
		})?;
		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn scan(&self) -> Result<Vec<JwksCacheEntry>, StoreError> {
		let listing = fs::read_dir(&self.directory).map_err(|e| StoreError::Backend {
			message: format!("Failed to list {}: {e}", self.directory.display()),
		})?;
		let mut entries = Vec::new();

		for item in listing {
			let path = item
				.map_err(|e| StoreError::Backend {
					message: format!("Failed to list {}: {e}", self.directory.display()),
				})?
				.path();

			if path.extension().is_none_or(|ext| ext != ENTRY_EXTENSION) {
				continue;
			}

			match Self::read_entry(&path) {
				Ok(Some(entry)) => entries.push(entry),
				Ok(None) => {},
				Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable key set file."),
			}
		}

		Ok(entries)
	}
}
impl JwksBackend for FileStore {
	fn save(&self, entry: JwksCacheEntry) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.write_entry(&entry) })
	}

	fn fetch<'a>(&'a self, url: &'a Url) -> StoreFuture<'a, Option<JwksCacheEntry>> {
		Box::pin(async move { Self::read_entry(&self.entry_path(url)) })
	}

	fn entries(&self) -> StoreFuture<'_, Vec<JwksCacheEntry>> {
		Box::pin(async move { self.scan() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{jwks_document, platform_signing_key, temp_dir};

	#[tokio::test]
	async fn save_and_reload_across_reopen() {
		let dir = temp_dir("file_store");
		let url = Url::parse("https://lms.example.edu/.well-known/jwks.json?tenant=1")
			.expect("JWKS URL should parse.");
		let key = platform_signing_key("platform-key-1");
		let key_set = serde_json::from_str(&jwks_document(&[&key])).expect("JWKS should parse.");
		let entry = JwksCacheEntry {
			source_url: url.clone(),
			fetched_at: Some(OffsetDateTime::now_utc()),
			key_set,
		};
		let store = FileStore::open(&dir).expect("Store directory should be created.");

		store.save(entry).await.expect("Entry should persist.");

		let file_name = store
			.entry_path(&url)
			.file_name()
			.and_then(|name| name.to_str())
			.map(str::to_owned)
			.expect("Entry path should have a UTF-8 file name.");

		assert!(!file_name.contains('/'));
		assert!(file_name.ends_with(".json"));

		drop(store);

		let reopened = FileStore::open(&dir).expect("Store should reopen.");
		let fetched = reopened
			.fetch(&url)
			.await
			.expect("Fetch should work.")
			.expect("Entry should survive reopen.");

		assert_eq!(fetched.source_url, url);
		assert!(fetched.find("platform-key-1").is_some());
		assert_eq!(reopened.urls().await.expect("URLs should list."), vec![url]);

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store directory {}: {e}", dir.display())
		});
	}

	#[tokio::test]
	async fn missing_entry_is_none() {
		let dir = temp_dir("file_store_missing");
		let store = FileStore::open(&dir).expect("Store directory should be created.");
		let url = Url::parse("https://unknown.example.edu/jwks").expect("JWKS URL should parse.");

		assert!(store.fetch(&url).await.expect("Fetch should work.").is_none());
		assert!(store.entries().await.expect("Scan should work.").is_empty());

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store directory {}: {e}", dir.display())
		});
	}
}
