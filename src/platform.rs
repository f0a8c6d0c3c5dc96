//! Per-platform access tokens for platform-proprietary REST APIs.
//!
//! These APIs authenticate the tool with a shared secret (HTTP Basic on the token endpoint)
//! instead of a signed assertion. [`PlatformTokenCache`] keeps one token per platform host and
//! refreshes it from two directions: foreground callers that need a token now, and a background
//! worker that renews idle platforms ahead of expiry. The worker skips any platform a foreground
//! caller is currently refreshing.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, PlatformId, ScopeSet},
	backchannel::{
		Backchannel, BackchannelKey, ChannelCredentials, ChannelKind, ChannelRequest, JsonResult,
		services::MEDIA_TYPE_JSON,
	},
	config::RestApiConfig,
	error::ConfigError,
	http::{ReqwestHttpClient, RoutingConfig},
	oauth::{ClientAuthentication, TokenExchange},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, RefreshMetrics},
	worker::BackgroundTask,
};

#[derive(Debug, Default)]
struct PlatformEntry {
	token: RwLock<Option<Arc<AccessToken>>>,
	foreground: AtomicUsize,
	refresh: AsyncMutex<()>,
}
impl PlatformEntry {
	fn usable_token(&self, lead: Duration) -> Option<Arc<AccessToken>> {
		let now = OffsetDateTime::now_utc();

		self.token.read().as_ref().filter(|token| !token.is_expired_at(now + lead)).cloned()
	}
}

/// Marks a platform as refreshed by a foreground caller for as long as it lives.
struct ForegroundMark<'a>(&'a AtomicUsize);
impl<'a> ForegroundMark<'a> {
	fn new(counter: &'a AtomicUsize) -> Self {
		counter.fetch_add(1, Ordering::SeqCst);

		Self(counter)
	}
}
impl Drop for ForegroundMark<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

/// One REST API token per platform host.
#[derive(Debug)]
pub struct PlatformTokenCache {
	settings: RestApiConfig,
	http: ReqwestHttpClient,
	entries: RwLock<HashMap<PlatformId, Arc<PlatformEntry>>>,
	metrics: Arc<RefreshMetrics>,
}
impl PlatformTokenCache {
	/// Builds an empty cache.
	pub fn new(settings: RestApiConfig, routing: &RoutingConfig) -> Result<Self> {
		let http = ReqwestHttpClient::from_routing(routing)?;

		Ok(Self {
			settings,
			http,
			entries: RwLock::new(HashMap::new()),
			metrics: Default::default(),
		})
	}

	/// REST API settings.
	pub fn settings(&self) -> &RestApiConfig {
		&self.settings
	}

	/// Refresh counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		Arc::clone(&self.metrics)
	}

	/// Platforms with a cache entry.
	pub fn platforms(&self) -> Vec<PlatformId> {
		self.entries.read().keys().cloned().collect()
	}

	/// Cached token for `platform`, expired or not, without refreshing.
	pub fn cached_token(&self, platform: &PlatformId) -> Option<Arc<AccessToken>> {
		self.entries.read().get(platform)?.token.read().clone()
	}

	/// Returns an unexpired token for `platform`, refreshing it first when needed.
	///
	/// Starts tracking `platform` on first use. While this call runs the background worker leaves
	/// the platform alone, and concurrent callers for the same platform share one refresh.
	pub async fn get_token(&self, platform: &PlatformId) -> Result<Arc<AccessToken>> {
		let entry = self.entry_for(platform);
		let _foreground = ForegroundMark::new(&entry.foreground);

		self.refresh_if_needed(platform, &entry, Duration::ZERO).await
	}

	/// Renews, ahead of expiry, the token of every tracked platform no foreground caller is
	/// refreshing.
	///
	/// A token is renewed when it would expire before the next cycle. Failures are logged and
	/// left for the next cycle. Returns how many platforms were renewed.
	pub async fn refresh_idle_platforms(&self) -> usize {
		let lead = Duration::try_from(self.settings.refresh_interval()).unwrap_or(Duration::ZERO);
		let snapshot: Vec<_> = self
			.entries
			.read()
			.iter()
			.map(|(platform, entry)| (platform.clone(), Arc::clone(entry)))
			.collect();
		let mut renewed = 0;

		for (platform, entry) in snapshot {
			if entry.foreground.load(Ordering::SeqCst) > 0 {
				tracing::debug!(%platform, "Skipping platform with a foreground refresh in progress.");

				continue;
			}
			if entry.usable_token(lead).is_some() {
				continue;
			}

			match self.refresh_if_needed(&platform, &entry, lead).await {
				Ok(_) => renewed += 1,
				Err(e) =>
					tracing::warn!(%platform, error = %e, "Background REST token refresh failed."),
			}
		}

		renewed
	}

	/// Spawns the periodic background refresh.
	pub fn start_refreshing(self: &Arc<Self>) -> BackgroundTask {
		let cache = Arc::clone(self);
		let interval = self.settings.refresh_interval();

		BackgroundTask::spawn_periodic("platform_token_refresh", interval, interval, move || {
			let cache = Arc::clone(&cache);

			async move {
				let renewed = cache.refresh_idle_platforms().await;

				tracing::debug!(renewed, "Platform token refresh cycle finished.");
			}
		})
	}

	fn entry_for(&self, platform: &PlatformId) -> Arc<PlatformEntry> {
		if let Some(entry) = self.entries.read().get(platform) {
			return Arc::clone(entry);
		}

		Arc::clone(self.entries.write().entry(platform.clone()).or_default())
	}

	async fn refresh_if_needed(
		&self,
		platform: &PlatformId,
		entry: &PlatformEntry,
		lead: Duration,
	) -> Result<Arc<AccessToken>> {
		if let Some(token) = entry.usable_token(lead) {
			return Ok(token);
		}

		let _singleflight = entry.refresh.lock().await;

		if let Some(token) = entry.usable_token(lead) {
			return Ok(token);
		}

		const KIND: FlowKind = FlowKind::PlatformTokenRefresh;

		let span = FlowSpan::new(KIND, "platform_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		match span.instrument(self.exchange(platform)).await {
			Ok(token) => {
				let token = Arc::new(token);

				*entry.token.write() = Some(Arc::clone(&token));

				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.metrics.record_success();
				tracing::debug!(%platform, expires_at = %token.expires_at, "Refreshed REST API token.");

				Ok(token)
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.metrics.record_failure();

				Err(e)
			},
		}
	}

	async fn exchange(&self, platform: &PlatformId) -> Result<AccessToken> {
		let token_url = self.settings.token_url(platform)?;
		let scopes = ScopeSet::default();
		let exchange = TokenExchange {
			http: &self.http,
			token_url: &token_url,
			client_id: &self.settings.client_id,
			scopes: &scopes,
			fallback_lifetime: self.settings.fallback_lifetime(),
		};

		exchange.exchange(ClientAuthentication::SecretBasic(&self.settings.client_secret)).await
	}
}

/// Calls one platform's REST API with tokens from a shared [`PlatformTokenCache`].
#[derive(Clone, Debug)]
pub struct PlatformRestClient {
	platform: PlatformId,
	cache: Arc<PlatformTokenCache>,
	channel: Arc<Backchannel>,
}
impl PlatformRestClient {
	/// Builds a client for `platform`.
	pub fn new(
		platform: PlatformId,
		cache: Arc<PlatformTokenCache>,
		routing: &RoutingConfig,
	) -> Result<Self> {
		let base = cache.settings().base_url(&platform)?;
		let key = BackchannelKey::new(
			platform.clone(),
			ChannelKind::PlatformRest,
			base,
			ScopeSet::default(),
		);
		let channel = Arc::new(Backchannel::new(key, ChannelCredentials::Anonymous, routing)?);

		Ok(Self { platform, cache, channel })
	}

	/// Platform this client talks to.
	pub fn platform(&self) -> &PlatformId {
		&self.platform
	}

	/// `GET {base}{path}`.
	pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<JsonResult> {
		let mut request = ChannelRequest::get(self.url(path)?).accept(MEDIA_TYPE_JSON);

		for (name, value) in query {
			request = request.query(*name, *value);
		}

		self.send(request).await
	}

	/// `PUT {base}{path}` with a JSON body.
	pub async fn put(&self, path: &str, body: &serde_json::Value) -> Result<JsonResult> {
		let request = ChannelRequest::put(self.url(path)?)
			.accept(MEDIA_TYPE_JSON)
			.json_body(MEDIA_TYPE_JSON, body);

		self.send(request).await
	}

	async fn send(&self, request: ChannelRequest) -> Result<JsonResult> {
		let token = self.cache.get_token(&self.platform).await?;

		self.channel.execute(request.bearer(token.value.clone())).await
	}

	fn url(&self, path: &str) -> Result<Url> {
		self.channel
			.key()
			.url
			.join(path)
			.map_err(|e| ConfigError::invalid_endpoint(path, e).into())
	}
}
