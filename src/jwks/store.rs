// crates.io
use jsonwebtoken::{
	DecodingKey, TokenData, Validation,
	jwk::{Jwk, JwkSet},
};
// self
use crate::{
	_prelude::*,
	backchannel::{Backchannel, JsonResult},
	config::JwksConfig,
	error::TransientError,
	jwks::JwksCacheEntry,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, RefreshMetrics},
	store::JwksBackend,
	worker::BackgroundTask,
};

/// Effect of a successful refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The fetched key set replaced the cached one and was persisted.
	Replaced,
	/// The fetched key set announced no new key id; nothing was written.
	Unchanged,
}

/// Totals of one background sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
	/// URLs visited.
	pub visited: usize,
	/// URLs whose key set was replaced.
	pub replaced: usize,
	/// URLs whose refresh failed; their previous key set is still served.
	pub failed: usize,
}

/// Trusted platform key sets, cached per source URL.
///
/// Lookups never touch the network. A failed refresh leaves the last good key set in place, so
/// verification keeps working against stale keys while a platform is unreachable.
pub struct JwksStore {
	backend: Arc<dyn JwksBackend>,
	channel: Arc<Backchannel>,
	config: JwksConfig,
	entries: RwLock<HashMap<Url, Arc<JwksCacheEntry>>>,
	guards: Mutex<HashMap<Url, Arc<AsyncMutex<()>>>>,
	metrics: Arc<RefreshMetrics>,
}
impl JwksStore {
	/// Opens the store, loading every persisted entry into memory.
	///
	/// `channel` performs the unauthenticated key set fetches.
	pub async fn open(
		backend: Arc<dyn JwksBackend>,
		channel: Arc<Backchannel>,
		config: JwksConfig,
	) -> Result<Self> {
		let persisted = backend.entries().await?;
		let entries = persisted
			.into_iter()
			.map(|entry| (entry.source_url.clone(), Arc::new(entry)))
			.collect::<HashMap<_, _>>();

		tracing::info!(entries = entries.len(), "Loaded persisted platform key sets.");

		Ok(Self {
			backend,
			channel,
			config,
			entries: RwLock::new(entries),
			guards: Mutex::new(HashMap::new()),
			metrics: Default::default(),
		})
	}

	/// Refresh counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		Arc::clone(&self.metrics)
	}

	/// Returns `true` if `url` is tracked.
	pub fn is_registered(&self, url: &Url) -> bool {
		self.entries.read().contains_key(url)
	}

	/// Cached entry for `url`.
	pub fn entry(&self, url: &Url) -> Option<Arc<JwksCacheEntry>> {
		self.entries.read().get(url).cloned()
	}

	/// Trusts `url` and immediately refreshes it.
	///
	/// The URL stays registered when the refresh fails; the background sweep retries it.
	pub async fn register_uri(&self, url: &Url) -> Result<RefreshOutcome> {
		if !self.is_registered(url) {
			self.track(url).await?;
		}

		self.refresh(url).await
	}

	/// Fetches the key set at `url` and replaces the cached one when it announces a new key id.
	///
	/// Concurrent refreshes of the same URL run one at a time. Failures are returned without
	/// retrying and leave the cached entry untouched.
	pub async fn refresh(&self, url: &Url) -> Result<RefreshOutcome> {
		let guard = self.guard_for(url);
		let _singleflight = guard.lock().await;

		const KIND: FlowKind = FlowKind::JwksRefresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		match span.instrument(self.fetch_and_replace(url)).await {
			Ok(outcome) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.metrics.record_success();
				tracing::debug!(%url, ?outcome, "Refreshed platform key set.");

				Ok(outcome)
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.metrics.record_failure();
				tracing::warn!(%url, error = %e, "Platform key set refresh failed; keeping cached keys.");

				Err(e)
			},
		}
	}

	/// Refreshes every persisted URL in turn, pausing between fetches.
	pub async fn refresh_all(&self) -> Result<SweepReport> {
		let urls = self.backend.urls().await?;
		let mut report = SweepReport::default();

		for (i, url) in urls.iter().enumerate() {
			if i > 0 {
				tokio::time::sleep(self.config.politeness_delay()).await;
			}

			report.visited += 1;

			match self.refresh(url).await {
				Ok(RefreshOutcome::Replaced) => report.replaced += 1,
				Ok(RefreshOutcome::Unchanged) => {},
				Err(_) => report.failed += 1,
			}
		}

		Ok(report)
	}

	/// Public key with id `kid` published at `url`, from cache only.
	pub fn resolve_signing_key(&self, url: &Url, kid: &str) -> Option<DecodingKey> {
		let jwk = self.resolve_jwk(url, kid)?;

		match DecodingKey::from_jwk(&jwk) {
			Ok(key) => Some(key),
			Err(e) => {
				tracing::warn!(%url, kid, error = %e, "Cached key cannot be used for verification.");

				None
			},
		}
	}

	/// JWK with id `kid` published at `url`, from cache only.
	pub fn resolve_jwk(&self, url: &Url, kid: &str) -> Option<Jwk> {
		self.entries.read().get(url)?.find(kid).cloned()
	}

	/// Verifies a platform-signed JWT against the key its header names.
	///
	/// A token without `kid`, or whose key is not cached for `url`, is untrusted.
	pub fn verify<C>(&self, token: &str, url: &Url, validation: &Validation) -> Result<TokenData<C>>
	where
		C: DeserializeOwned,
	{
		let header = jsonwebtoken::decode_header(token)
			.map_err(|e| Error::UntrustedMessage { reason: format!("malformed header: {e}") })?;
		let kid = header
			.kid
			.ok_or_else(|| Error::UntrustedMessage { reason: "header names no key id".into() })?;
		let key = self.resolve_signing_key(url, &kid).ok_or_else(|| Error::UntrustedMessage {
			reason: format!("no key `{kid}` is cached for {url}"),
		})?;

		jsonwebtoken::decode(token, &key, validation)
			.map_err(|e| Error::UntrustedMessage { reason: e.to_string() })
	}

	/// Spawns the periodic sweep configured by [`JwksConfig`].
	pub fn start_refreshing(self: &Arc<Self>) -> BackgroundTask {
		let store = Arc::clone(self);

		BackgroundTask::spawn_periodic(
			"jwks_refresh",
			self.config.initial_delay(),
			self.config.refresh_interval(),
			move || {
				let store = Arc::clone(&store);

				async move {
					match store.refresh_all().await {
						Ok(report) => tracing::info!(?report, "Platform key set sweep finished."),
						Err(e) => tracing::error!(error = %e, "Platform key set sweep could not start."),
					}
				}
			},
		)
	}

	async fn fetch_and_replace(&self, url: &Url) -> Result<RefreshOutcome> {
		let fetched = match self.channel.fetch_public_json::<JwkSet>(url).await {
			JsonResult::Success { payload, .. } => payload,
			other => {
				return Err(TransientError::Endpoint {
					message: other.message(),
					status: other.status(),
				}
				.into());
			},
		};
		let current = match self.entry(url) {
			Some(entry) => entry,
			None => Arc::new(
				self.backend
					.fetch(url)
					.await?
					.unwrap_or_else(|| JwksCacheEntry::registered(url.clone())),
			),
		};

		if !current.needs_replacement(&fetched) {
			return Ok(RefreshOutcome::Unchanged);
		}

		let replacement = current.replaced(fetched, OffsetDateTime::now_utc());

		self.backend.save(replacement.clone()).await?;
		self.entries.write().insert(url.clone(), Arc::new(replacement));

		Ok(RefreshOutcome::Replaced)
	}

	/// Creates the entry for `url` under its refresh guard, so a placeholder can never land on
	/// top of a key set a concurrent refresh has just persisted.
	async fn track(&self, url: &Url) -> Result<()> {
		let guard = self.guard_for(url);
		let _singleflight = guard.lock().await;

		if self.is_registered(url) {
			return Ok(());
		}

		let entry = match self.backend.fetch(url).await? {
			Some(persisted) => persisted,
			None => {
				let entry = JwksCacheEntry::registered(url.clone());

				self.backend.save(entry.clone()).await?;

				entry
			},
		};

		self.entries.write().entry(url.clone()).or_insert_with(|| Arc::new(entry));
		tracing::info!(%url, "Registered platform key set URL.");

		Ok(())
	}

	fn guard_for(&self, url: &Url) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		Arc::clone(guards.entry(url.clone()).or_default())
	}
}
impl Debug for JwksStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwksStore")
			.field("entries", &self.entries.read().len())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
