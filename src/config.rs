//! Tool configuration loaded from a camelCase JSON document.
//!
//! Every field has a default, so an empty object (`{}`) is a valid configuration for a tool that
//! only validates launches and calls LTI services.

// std
use std::{
	path::{Path, PathBuf},
	time::Duration as StdDuration,
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::ConfigError,
	http::RoutingConfig,
};

/// Top-level tool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolConfig {
	/// Public host name of the tool; labels the tool's own fetch channel.
	pub host_name: String,
	/// Outbound proxy for every backchannel call.
	pub backchannel_proxy: Option<Url>,
	/// Accept invalid TLS certificates. Never enable in production.
	pub development_trust_all_servers_mode: bool,
	/// Outbound HTTP timeouts.
	pub http: HttpConfig,
	/// Client assertion settings.
	pub assertion: AssertionConfig,
	/// Platform key set cache settings.
	pub jwks: JwksConfig,
	/// Platform REST API credentials; `None` disables the REST token cache.
	pub rest: Option<RestApiConfig>,
}
impl ToolConfig {
	/// Reads and parses a configuration file, reporting the JSON path of any invalid value.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Load { path: path.display().to_string(), source })?;

		Self::from_json(&text)
	}

	/// Parses a configuration document.
	pub fn from_json(text: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(text);

		let config: Self = serde_path_to_error::deserialize(de).map_err(|e| ConfigError::Parse {
			path: e.path().to_string(),
			source: e.into_inner(),
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Rejects zero or negative durations and intervals.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let checks = [
			("http.connectTimeoutSecs", self.http.connect_timeout_secs > 0),
			("http.requestTimeoutSecs", self.http.request_timeout_secs > 0),
			("assertion.lifetimeSecs", self.assertion.lifetime_secs > 0),
			("jwks.refreshIntervalSecs", self.jwks.refresh_interval_secs > 0),
		];

		for (path, valid) in checks {
			if !valid {
				return Err(ConfigError::NonPositive { path });
			}
		}
		if let Some(rest) = &self.rest {
			rest.validate()?;
		}

		Ok(())
	}

	/// Routing applied to every outbound client.
	pub fn routing(&self) -> RoutingConfig {
		let mut routing = RoutingConfig::default()
			.with_trust_all_servers(self.development_trust_all_servers_mode)
			.with_connect_timeout(self.http.connect_timeout())
			.with_request_timeout(self.http.request_timeout());

		if let Some(proxy) = &self.backchannel_proxy {
			routing = routing.with_proxy(proxy.clone());
		}

		routing
	}
}
impl Default for ToolConfig {
	fn default() -> Self {
		Self {
			host_name: "localhost".into(),
			backchannel_proxy: None,
			development_trust_all_servers_mode: false,
			http: HttpConfig::default(),
			assertion: AssertionConfig::default(),
			jwks: JwksConfig::default(),
			rest: None,
		}
	}
}

/// Outbound HTTP timeouts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
	/// TCP/TLS connect timeout in seconds.
	pub connect_timeout_secs: u64,
	/// Whole-request timeout in seconds.
	pub request_timeout_secs: u64,
}
impl HttpConfig {
	/// Connect timeout.
	pub fn connect_timeout(&self) -> StdDuration {
		StdDuration::from_secs(self.connect_timeout_secs)
	}

	/// Request timeout.
	pub fn request_timeout(&self) -> StdDuration {
		StdDuration::from_secs(self.request_timeout_secs)
	}
}
impl Default for HttpConfig {
	fn default() -> Self {
		Self { connect_timeout_secs: 10, request_timeout_secs: 30 }
	}
}

/// Client assertion settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssertionConfig {
	/// `iss` claim; the platform-assigned client id is used when absent.
	pub issuer: Option<String>,
	/// Validity window of each assertion, in seconds.
	pub lifetime_secs: i64,
}
impl AssertionConfig {
	/// Validity window of each assertion.
	pub fn lifetime(&self) -> Duration {
		Duration::seconds(self.lifetime_secs)
	}
}
impl Default for AssertionConfig {
	fn default() -> Self {
		Self { issuer: None, lifetime_secs: 300 }
	}
}

/// Platform key set cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwksConfig {
	/// Directory holding one persisted key set per source URL; in-memory when absent.
	pub directory: Option<PathBuf>,
	/// Delay before the first background sweep, in seconds.
	pub initial_delay_secs: u64,
	/// Period of the background sweep, in seconds.
	pub refresh_interval_secs: u64,
	/// Pause between two fetches within one sweep, in milliseconds.
	pub politeness_delay_ms: u64,
}
impl JwksConfig {
	/// Delay before the first background sweep.
	pub fn initial_delay(&self) -> StdDuration {
		StdDuration::from_secs(self.initial_delay_secs)
	}

	/// Period of the background sweep.
	pub fn refresh_interval(&self) -> StdDuration {
		StdDuration::from_secs(self.refresh_interval_secs)
	}

	/// Pause between two fetches within one sweep.
	pub fn politeness_delay(&self) -> StdDuration {
		StdDuration::from_millis(self.politeness_delay_ms)
	}
}
impl Default for JwksConfig {
	fn default() -> Self {
		Self {
			directory: None,
			initial_delay_secs: 60,
			refresh_interval_secs: 300,
			politeness_delay_ms: 2_000,
		}
	}
}

/// Credentials and endpoints of a platform-proprietary REST API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiConfig {
	/// REST application id.
	pub client_id: ClientId,
	/// REST application secret.
	pub client_secret: TokenSecret,
	/// URL scheme used to reach platforms.
	#[serde(default = "RestApiConfig::default_scheme")]
	pub scheme: String,
	/// Token endpoint path on every platform host.
	#[serde(default = "RestApiConfig::default_token_path")]
	pub token_path: String,
	/// Period of the background token refresh, in seconds.
	#[serde(default = "RestApiConfig::default_refresh_interval_secs")]
	pub refresh_interval_secs: u64,
	/// Lifetime assumed when a token response omits `expires_in`, in seconds.
	#[serde(default = "RestApiConfig::default_fallback_lifetime_secs")]
	pub fallback_lifetime_secs: i64,
}
impl RestApiConfig {
	/// Credentials with default endpoints and intervals.
	pub fn new(client_id: ClientId, client_secret: impl Into<TokenSecret>) -> Self {
		Self {
			client_id,
			client_secret: client_secret.into(),
			scheme: Self::default_scheme(),
			token_path: Self::default_token_path(),
			refresh_interval_secs: Self::default_refresh_interval_secs(),
			fallback_lifetime_secs: Self::default_fallback_lifetime_secs(),
		}
	}

	/// Rejects a zero refresh interval or a non-positive fallback lifetime.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.refresh_interval_secs == 0 {
			return Err(ConfigError::NonPositive { path: "rest.refreshIntervalSecs" });
		}
		if self.fallback_lifetime_secs <= 0 {
			return Err(ConfigError::NonPositive { path: "rest.fallbackLifetimeSecs" });
		}

		Ok(())
	}

	/// Overrides the URL scheme, e.g. `http` against a local mock.
	pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.scheme = scheme.into();

		self
	}

	/// Base URL of the REST API on `host`.
	pub fn base_url(&self, host: &str) -> Result<Url, ConfigError> {
		let text = format!("{}://{host}/", self.scheme);

		Url::parse(&text).map_err(|e| ConfigError::invalid_endpoint(text, e))
	}

	/// Token endpoint on `host`.
	pub fn token_url(&self, host: &str) -> Result<Url, ConfigError> {
		let text = format!("{}://{host}{}", self.scheme, self.token_path);

		Url::parse(&text).map_err(|e| ConfigError::invalid_endpoint(text, e))
	}

	/// Period of the background token refresh.
	pub fn refresh_interval(&self) -> StdDuration {
		StdDuration::from_secs(self.refresh_interval_secs)
	}

	/// Lifetime assumed when a token response omits `expires_in`.
	pub fn fallback_lifetime(&self) -> Duration {
		Duration::seconds(self.fallback_lifetime_secs)
	}

	fn default_scheme() -> String {
		"https".into()
	}

	fn default_token_path() -> String {
		"/learn/api/public/v1/oauth2/token".into()
	}

	fn default_refresh_interval_secs() -> u64 {
		60
	}

	fn default_fallback_lifetime_secs() -> i64 {
		60
	}
}
