//! Owned coordinator wiring configuration, pooled channels, key sets, and REST tokens together.
//!
//! A host application builds one [`Toolkit`] at startup, calls [`Toolkit::start`] to launch the
//! background refreshers, hands out channels to its request handlers, and calls
//! [`Toolkit::shutdown`] when it stops.

// crates.io
use jsonwebtoken::jwk::JwkSet;
// self
use crate::{
	_prelude::*,
	assertion::ToolSigningKey,
	auth::{ClientId, PlatformId, ScopeSet},
	backchannel::{
		Backchannel, BackchannelKey, BackchannelRegistry, ChannelCredentials, ChannelKind, OwnerId,
	},
	config::ToolConfig,
	error::ConfigError,
	jwks::JwksStore,
	platform::{PlatformRestClient, PlatformTokenCache},
	store::{FileStore, JwksBackend, MemoryStore},
	tool::{ToolDescriptor, ToolRegistry},
	worker::BackgroundTask,
};

/// A platform as registered with the tool: where to obtain tokens and under which client id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformClient {
	/// Platform host.
	pub platform: PlatformId,
	/// Client id the platform assigned to the tool.
	pub client_id: ClientId,
	/// Platform token endpoint.
	pub token_url: Url,
}

/// Process-wide toolkit state.
#[derive(Debug)]
pub struct Toolkit {
	config: ToolConfig,
	tools: ToolRegistry,
	registry: BackchannelRegistry,
	signing_key: Option<Arc<ToolSigningKey>>,
	jwks: Arc<JwksStore>,
	platform_tokens: Option<Arc<PlatformTokenCache>>,
	owner: OwnerId,
	workers: AsyncMutex<Vec<BackgroundTask>>,
}
impl Toolkit {
	/// Builds the toolkit and loads persisted key sets.
	///
	/// The REST token cache is only built when a registered tool uses the platform REST API, in
	/// which case REST credentials must be configured.
	pub async fn open(
		config: ToolConfig,
		tools: impl IntoIterator<Item = ToolDescriptor>,
		signing_key: Option<ToolSigningKey>,
	) -> Result<Self> {
		config.validate()?;

		let tools = ToolRegistry::build(tools)?;
		let registry = BackchannelRegistry::new(config.routing());
		let owner = OwnerId::allocate();
		let fetch_channel = registry.acquire(owner, &Self::fetch_key(&config)?, || {
			Ok(ChannelCredentials::Anonymous)
		})?;
		let backend: Arc<dyn JwksBackend> = match &config.jwks.directory {
			Some(directory) => Arc::new(FileStore::open(directory)?),
			None => Arc::new(MemoryStore::default()),
		};
		let jwks = Arc::new(JwksStore::open(backend, fetch_channel, config.jwks.clone()).await?);
		let platform_tokens = if tools.uses_platform_rest() {
			let rest = config.rest.clone().ok_or(ConfigError::PlatformRestDisabled)?;

			Some(Arc::new(PlatformTokenCache::new(rest, registry.routing())?))
		} else {
			None
		};

		tracing::info!(
			tools = tools.len(),
			platform_rest = platform_tokens.is_some(),
			signing_key = signing_key.is_some(),
			"Opened LTI toolkit."
		);

		Ok(Self {
			config,
			tools,
			registry,
			signing_key: signing_key.map(Arc::new),
			jwks,
			platform_tokens,
			owner,
			workers: AsyncMutex::new(Vec::new()),
		})
	}

	/// Starts the background refreshers; calling it again while they run does nothing.
	///
	/// Must be called from within a Tokio runtime.
	pub async fn start(&self) {
		let mut workers = self.workers.lock().await;

		if !workers.is_empty() {
			return;
		}

		workers.push(self.jwks.start_refreshing());

		if let Some(cache) = &self.platform_tokens {
			workers.push(cache.start_refreshing());
		}
	}

	/// Stops the background refreshers.
	pub async fn shutdown(&self) {
		let workers = std::mem::take(&mut *self.workers.lock().await);

		for worker in workers {
			worker.stop().await;
		}

		tracing::info!("LTI toolkit shut down.");
	}

	/// Pooled channel for an LTI Advantage service authenticated with signed client assertions.
	pub fn lti_service_channel(
		&self,
		owner: OwnerId,
		client: &PlatformClient,
		kind: ChannelKind,
		service_url: Url,
		scopes: ScopeSet,
	) -> Result<Arc<Backchannel>> {
		let key = BackchannelKey::new(client.platform.clone(), kind, service_url, scopes);

		self.registry.acquire(owner, &key, || {
			Ok(ChannelCredentials::signed_assertion(
				client.token_url.clone(),
				client.client_id.clone(),
				self.signing_key.clone(),
				self.config.assertion.issuer.clone(),
				self.config.assertion.lifetime(),
			))
		})
	}

	/// Pooled channel for dynamic registration with `platform`.
	pub fn registration_channel(
		&self,
		owner: OwnerId,
		platform: &PlatformId,
		registration_endpoint: Url,
	) -> Result<Arc<Backchannel>> {
		let key = BackchannelKey::new(
			platform.clone(),
			ChannelKind::DynamicRegistration,
			registration_endpoint,
			ScopeSet::default(),
		);

		self.registry.acquire(owner, &key, || Ok(ChannelCredentials::Anonymous))
	}

	/// Pooled channel for `platform`'s REST API, holding its own shared-secret token.
	///
	/// Tokens without `expires_in` use the configured REST fallback lifetime.
	pub fn platform_rest_channel(
		&self,
		owner: OwnerId,
		platform: &PlatformId,
	) -> Result<Arc<Backchannel>> {
		let rest = self.config.rest.as_ref().ok_or(ConfigError::PlatformRestDisabled)?;
		let key = BackchannelKey::new(
			platform.clone(),
			ChannelKind::PlatformRest,
			rest.base_url(platform)?,
			ScopeSet::default(),
		);

		self.registry.acquire_with(owner, &key, |routing| {
			let credentials = ChannelCredentials::SecretBasic {
				token_url: rest.token_url(platform)?,
				client_id: rest.client_id.clone(),
				client_secret: rest.client_secret.clone(),
			};

			Ok(Backchannel::new(key.clone(), credentials, routing)?
				.with_fallback_lifetime(rest.fallback_lifetime()))
		})
	}

	/// REST client for `platform` drawing tokens from the shared cache.
	pub fn platform_rest_client(&self, platform: &PlatformId) -> Result<PlatformRestClient> {
		let cache = self.platform_tokens.as_ref().ok_or(ConfigError::PlatformRestDisabled)?;

		PlatformRestClient::new(platform.clone(), Arc::clone(cache), self.registry.routing())
	}

	/// Drops `owner` from every pooled channel; returns how many channels were disposed.
	pub fn release(&self, owner: OwnerId) -> usize {
		self.registry.release(owner)
	}

	/// Trusted platform key sets.
	pub fn jwks(&self) -> &Arc<JwksStore> {
		&self.jwks
	}

	/// REST token cache, when a registered tool uses the platform REST API.
	pub fn platform_tokens(&self) -> Option<&Arc<PlatformTokenCache>> {
		self.platform_tokens.as_ref()
	}

	/// JWKS document platforms fetch to verify the tool's client assertions.
	pub fn tool_jwks(&self) -> JwkSet {
		match &self.signing_key {
			Some(key) => key.public_jwks(),
			None => JwkSet { keys: Vec::new() },
		}
	}

	/// Registered tools.
	pub fn tools(&self) -> &ToolRegistry {
		&self.tools
	}

	/// Pooled channels.
	pub fn registry(&self) -> &BackchannelRegistry {
		&self.registry
	}

	/// Configuration the toolkit was opened with.
	pub fn config(&self) -> &ToolConfig {
		&self.config
	}

	/// Owner handle holding the toolkit's own key set fetch channel.
	pub fn owner(&self) -> OwnerId {
		self.owner
	}

	fn fetch_key(config: &ToolConfig) -> Result<BackchannelKey> {
		let host = PlatformId::new(&config.host_name).map_err(ConfigError::from)?;
		let text = format!("https://{}/", config.host_name);
		let url = Url::parse(&text).map_err(|e| ConfigError::invalid_endpoint(text, e))?;

		Ok(BackchannelKey::new(host, ChannelKind::PublicFetch, url, ScopeSet::default()))
	}
}
