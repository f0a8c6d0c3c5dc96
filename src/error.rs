//! Toolkit-level error types shared across backchannels, key stores, and token caches.

// self
use crate::_prelude::*;

/// Toolkit-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical toolkit error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Client assertion could not be produced.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Unexpected upstream response; the next scheduled cycle or the caller may retry.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Platform token endpoint declared an OAuth error.
	#[error("Platform rejected the token request: {reason}.")]
	TokenRejected {
		/// OAuth error code or description supplied by the platform.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Signed inbound message could not be verified against a trusted key.
	#[error("Signed message is not trusted: {reason}.")]
	UntrustedMessage {
		/// Why verification failed.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for failures raised while acquiring an access token from a platform.
	pub fn is_token_acquisition_failure(&self) -> bool {
		matches!(self, Self::TokenRejected { .. } | Self::Transient(_) | Self::Transport(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Endpoint URL cannot be used.
	#[error("Endpoint URL `{url}` is invalid.")]
	InvalidEndpoint {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration file could not be read.
	#[error("Configuration file {path} could not be read.")]
	Load {
		/// Path of the configuration file.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration file contains invalid JSON or values.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// JSON path of the offending value.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Duration or interval setting must be greater than zero.
	#[error("Configuration value `{path}` must be greater than zero.")]
	NonPositive {
		/// JSON path of the offending value.
		path: &'static str,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Access token builder validation failed.
	#[error("Unable to build access token.")]
	TokenBuild(#[from] crate::auth::AccessTokenBuilderError),
	/// Tool registration table contains the same tool twice.
	#[error("Tool `{tool}` is registered more than once.")]
	DuplicateTool {
		/// Display form of the duplicated tool key.
		tool: String,
	},
	/// Channel kind cannot authenticate with bearer tokens.
	#[error("Backchannel {kind} does not carry credentials.")]
	MissingCredentials {
		/// Channel kind label.
		kind: &'static str,
	},
	/// Platform REST access was requested but no REST credentials are configured.
	#[error("Platform REST API credentials are not configured.")]
	PlatformRestDisabled,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a URL parse failure with the offending text.
	pub fn invalid_endpoint(url: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidEndpoint { url: url.into(), source }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while producing a signed client assertion.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// No signing key is configured for the tool.
	#[error("No signing key is configured for the client assertion.")]
	MissingKey,
	/// Private key material cannot be parsed.
	#[error("Private key material is unusable: {reason}.")]
	UnusableKey {
		/// Parser-supplied reason.
		reason: String,
	},
	/// Assertion builder is missing a required claim.
	#[error("Client assertion is missing the `{claim}` claim.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
	/// JWT encoding or signing failed.
	#[error("Client assertion could not be signed.")]
	Encode(#[source] jsonwebtoken::errors::Error),
}

/// Temporary failure variants (safe to retry on the next cycle).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Platform endpoint returned an unexpected but non-fatal response.
	#[error("Platform endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the platform.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured connect or request timeout.
	#[error("Request timed out while calling the platform.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the platform.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_acquisition_failures_are_classified() {
		let rejected = Error::TokenRejected { reason: "invalid_client".into(), status: Some(400) };
		let transient: Error =
			TransientError::Endpoint { message: "bad gateway".into(), status: Some(502) }.into();
		let signing: Error = SigningError::MissingKey.into();

		assert!(rejected.is_token_acquisition_failure());
		assert!(transient.is_token_acquisition_failure());
		assert!(!signing.is_token_acquisition_failure());
		assert!(rejected.to_string().contains("invalid_client"));
	}
}
