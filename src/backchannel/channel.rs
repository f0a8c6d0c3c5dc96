// crates.io
use reqwest::header::{ACCEPT, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	backchannel::{
		ChannelCredentials, ChannelKind, ChannelRequest, JsonResult, key::BackchannelKey,
		owner::OwnerId,
	},
	error::ConfigError,
	http::{ReqwestHttpClient, RoutingConfig},
	oauth::{ClientAuthentication, TokenExchange},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Authenticated channel to one platform service.
///
/// The channel owns at most one cached [`AccessToken`]. A token is reused while it is
/// unexpired; afterwards the first caller acquires a replacement while concurrent callers wait
/// on the same acquisition and then read the fresh value.
#[derive(Debug)]
pub struct Backchannel {
	key: BackchannelKey,
	credentials: ChannelCredentials,
	http: ReqwestHttpClient,
	owners: Mutex<HashSet<OwnerId>>,
	token: RwLock<Option<Arc<AccessToken>>>,
	acquisition: AsyncMutex<()>,
	fallback_lifetime: Duration,
}
impl Backchannel {
	/// Lifetime assumed when a token response omits `expires_in`.
	pub const DEFAULT_FALLBACK_LIFETIME: Duration = Duration::seconds(60);

	/// Builds a channel whose HTTP client honors `routing`.
	pub fn new(
		key: BackchannelKey,
		credentials: ChannelCredentials,
		routing: &RoutingConfig,
	) -> Result<Self> {
		let http = ReqwestHttpClient::from_routing(routing)?;

		Ok(Self {
			key,
			credentials,
			http,
			owners: Mutex::new(HashSet::new()),
			token: RwLock::new(None),
			acquisition: AsyncMutex::new(()),
			fallback_lifetime: Self::DEFAULT_FALLBACK_LIFETIME,
		})
	}

	/// Overrides the lifetime assumed when a token response omits `expires_in`.
	pub fn with_fallback_lifetime(mut self, lifetime: Duration) -> Self {
		self.fallback_lifetime = lifetime;

		self
	}

	/// Lifetime assumed when a token response omits `expires_in`.
	pub fn fallback_lifetime(&self) -> Duration {
		self.fallback_lifetime
	}

	/// Identity of the channel.
	pub fn key(&self) -> &BackchannelKey {
		&self.key
	}

	/// Service kind.
	pub fn kind(&self) -> ChannelKind {
		self.key.kind
	}

	/// Adds `owner`; returns `false` if it was already present.
	pub fn add_owner(&self, owner: OwnerId) -> bool {
		self.owners.lock().insert(owner)
	}

	/// Removes `owner`; returns `false` if it was not present.
	pub fn remove_owner(&self, owner: OwnerId) -> bool {
		self.owners.lock().remove(&owner)
	}

	/// Returns `true` while at least one owner holds the channel.
	pub fn has_owners(&self) -> bool {
		!self.owners.lock().is_empty()
	}

	/// Returns `true` if `owner` currently holds the channel.
	pub fn is_owned_by(&self, owner: OwnerId) -> bool {
		self.owners.lock().contains(&owner)
	}

	/// Cached token, expired or not.
	pub fn cached_token(&self) -> Option<Arc<AccessToken>> {
		self.token.read().clone()
	}

	/// Returns the cached token while it is usable, otherwise acquires a new one.
	///
	/// Failures are returned to the caller without retrying and leave the cache untouched.
	pub async fn get_access_token(&self) -> Result<Arc<AccessToken>> {
		if let Some(token) = self.usable_token() {
			return Ok(token);
		}

		let _singleflight = self.acquisition.lock().await;

		if let Some(token) = self.usable_token() {
			return Ok(token);
		}

		const KIND: FlowKind = FlowKind::TokenAcquisition;

		let span = FlowSpan::new(KIND, "backchannel_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match span.instrument(self.acquire_token()).await {
			Ok(token) => {
				let token = Arc::new(token);

				*self.token.write() = Some(Arc::clone(&token));

				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				tracing::debug!(
					channel = %self.key,
					expires_at = %token.expires_at,
					"Acquired backchannel access token."
				);

				Ok(token)
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::warn!(channel = %self.key, error = %e, "Backchannel token acquisition failed.");

				Err(e)
			},
		}
	}

	/// Executes `request` and decodes the body as JSON values.
	pub async fn execute(&self, request: ChannelRequest) -> Result<JsonResult> {
		self.execute_as(request).await
	}

	/// Executes `request`, attaching the channel's access token unless the request carries its
	/// own bearer credential, and decodes the body as `T` (success) or `E` (declared failure).
	///
	/// Only token acquisition errors are returned as `Err`; transport faults become
	/// [`JsonResult::Incomplete`].
	pub async fn execute_as<T, E>(&self, request: ChannelRequest) -> Result<JsonResult<T, E>>
	where
		T: DeserializeOwned,
		E: DeserializeOwned,
	{
		let bearer = match &request.bearer {
			Some(explicit) => Some(explicit.expose().to_owned()),
			None if self.credentials.carries_token() =>
				Some(self.get_access_token().await?.value.expose().to_owned()),
			None => None,
		};

		Ok(self.send(request, bearer.as_deref()).await)
	}

	pub(crate) async fn send<T, E>(
		&self,
		request: ChannelRequest,
		bearer: Option<&str>,
	) -> JsonResult<T, E>
	where
		T: DeserializeOwned,
		E: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::ServiceCall;

		let span = FlowSpan::new(KIND, "backchannel_execute");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut builder = self.http.request(request.method, request.url);

				if !request.query.is_empty() {
					builder = builder.query(&request.query);
				}
				if let Some(accept) = &request.accept {
					builder = builder.header(ACCEPT, accept.as_str());
				}
				if let Some(token) = bearer {
					builder = builder.bearer_auth(token);
				}
				if let Some(body) = request.body {
					if let Some(content_type) = &request.content_type {
						builder = builder.header(CONTENT_TYPE, content_type.as_str());
					}

					builder = builder.body(body);
				}

				let response = match builder.send().await {
					Ok(response) => response,
					Err(e) => return JsonResult::incomplete(describe_transport_error(&e)),
				};
				let status = response.status().as_u16();
				let content_type = response
					.headers()
					.get(CONTENT_TYPE)
					.and_then(|value| value.to_str().ok())
					.map(str::to_owned);

				match response.text().await {
					Ok(body) => JsonResult::from_parts(status, content_type, &body),
					Err(e) => JsonResult::incomplete(describe_transport_error(&e)),
				}
			})
			.await;

		if result.is_complete() {
			obs::record_flow_outcome(KIND, FlowOutcome::Success);
		} else {
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			tracing::warn!(channel = %self.key, message = %result.message(), "Backchannel call did not complete.");
		}

		result
	}

	fn usable_token(&self) -> Option<Arc<AccessToken>> {
		self.token.read().as_ref().filter(|token| !token.is_expired()).cloned()
	}

	async fn acquire_token(&self) -> Result<AccessToken> {
		match &self.credentials {
			ChannelCredentials::Anonymous =>
				Err(ConfigError::MissingCredentials { kind: self.key.kind.as_str() }.into()),
			ChannelCredentials::SignedAssertion { token_url, client_id, assertion } => {
				let jwt = assertion.sign()?;
				let exchange = TokenExchange {
					http: &self.http,
					token_url,
					client_id,
					scopes: &self.key.scopes,
					fallback_lifetime: self.fallback_lifetime,
				};

				exchange.exchange(ClientAuthentication::Assertion(&jwt)).await
			},
			ChannelCredentials::SecretBasic { token_url, client_id, client_secret } => {
				let exchange = TokenExchange {
					http: &self.http,
					token_url,
					client_id,
					scopes: &self.key.scopes,
					fallback_lifetime: self.fallback_lifetime,
				};

				exchange.exchange(ClientAuthentication::SecretBasic(client_secret)).await
			},
		}
	}
}

pub(crate) fn describe_transport_error(err: &ReqwestError) -> String {
	if err.is_timeout() {
		"Request timed out".into()
	} else if err.is_connect() {
		format!("Connection failed: {err}")
	} else if err.is_decode() || err.is_body() {
		format!("Response body could not be read: {err}")
	} else {
		format!("Request failed: {err}")
	}
}
