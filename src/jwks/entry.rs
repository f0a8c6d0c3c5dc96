// crates.io
use jsonwebtoken::jwk::{Jwk, JwkSet};
// self
use crate::_prelude::*;

/// Last known key set published at one source URL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwksCacheEntry {
	/// URL the key set is fetched from.
	pub source_url: Url,
	/// When the key set was last replaced; `None` until the first successful fetch.
	#[serde(default, with = "time::serde::timestamp::option")]
	pub fetched_at: Option<OffsetDateTime>,
	/// Keys published at `source_url`.
	pub key_set: JwkSet,
}
impl JwksCacheEntry {
	/// Empty entry for a URL that has been trusted but not fetched yet.
	pub fn registered(source_url: Url) -> Self {
		Self { source_url, fetched_at: None, key_set: JwkSet { keys: Vec::new() } }
	}

	/// Returns `true` once a key set has been fetched.
	pub fn is_populated(&self) -> bool {
		self.fetched_at.is_some()
	}

	/// Key with id `kid`.
	pub fn find(&self, kid: &str) -> Option<&Jwk> {
		self.key_set.find(kid)
	}

	/// Returns `true` when `fetched` should replace the cached key set.
	///
	/// A never-fetched entry is always replaced. Otherwise the set is replaced only when it
	/// announces a key id the cache does not hold yet; keys without an id always count as new.
	pub fn needs_replacement(&self, fetched: &JwkSet) -> bool {
		if !self.is_populated() {
			return true;
		}

		fetched.keys.iter().any(|key| match key.common.key_id.as_deref() {
			Some(kid) => self.find(kid).is_none(),
			None => true,
		})
	}

	/// Entry holding `key_set`, fetched at `now`.
	pub fn replaced(&self, key_set: JwkSet, now: OffsetDateTime) -> Self {
		Self { source_url: self.source_url.clone(), fetched_at: Some(now), key_set }
	}
}
