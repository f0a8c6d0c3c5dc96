//! Immutable access tokens with an absolute expiry instant.

// self
use crate::{
	_prelude::*,
	auth::{
		ScopeSet,
		token::{response::TokenResponse, secret::TokenSecret},
	},
};

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// The expiry instant falls outside the representable range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}

/// Bearer credential issued by a platform.
///
/// `expires_at` is fixed at issuance; a token is usable strictly before that instant and is
/// never extended. A refreshed credential is always a new value that replaces this one.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Access token secret; callers must avoid logging it.
	pub value: TokenSecret,
	/// Token type reported by the platform (usually `Bearer`).
	pub token_type: String,
	/// Scopes the token was granted for.
	pub scopes: ScopeSet,
	/// Refresh token secret, if the platform issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Issued-at instant recorded when the response arrived.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from `issued_at + expires_in`.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Ceiling applied to a platform-supplied `expires_in`, one year.
	pub const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

	/// Returns a builder for constructing tokens.
	pub fn builder(scopes: ScopeSet) -> AccessTokenBuilder {
		AccessTokenBuilder::new(scopes)
	}

	/// Converts a decoded token endpoint response issued at `issued_at`.
	///
	/// A missing or zero `expires_in` falls back to `fallback_lifetime` so a platform that omits
	/// the field cannot produce an effectively permanent cache entry. Larger values are capped at
	/// [`MAX_LIFETIME_SECS`](Self::MAX_LIFETIME_SECS). When the response echoes a
	/// `scope` it wins over the `requested` scopes.
	pub fn from_response(
		response: TokenResponse,
		requested: &ScopeSet,
		issued_at: OffsetDateTime,
		fallback_lifetime: Duration,
	) -> Result<Self, AccessTokenBuilderError> {
		let lifetime = match response.expires_in {
			Some(0) | None => fallback_lifetime,
			Some(secs) => Duration::seconds(
				i64::try_from(secs.min(Self::MAX_LIFETIME_SECS))
					.map_err(|_| AccessTokenBuilderError::ExpiresInOutOfRange)?,
			),
		};
		let scopes = response
			.scope
			.as_deref()
			.and_then(|raw| raw.parse::<ScopeSet>().ok())
			.filter(|granted| !granted.is_empty())
			.unwrap_or_else(|| requested.clone());
		let mut builder = Self::builder(scopes)
			.access_token(response.access_token)
			.token_type(response.token_type)
			.issued_at(issued_at)
			.expires_in(lifetime);

		if let Some(refresh) = response.refresh_token {
			builder = builder.refresh_token(refresh);
		}

		builder.build()
	}

	/// Returns `true` if the token can no longer be used at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Time left before expiry at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// `Authorization` header value for bearer requests.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.value.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("scopes", &self.scopes)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug)]
pub struct AccessTokenBuilder {
	scopes: ScopeSet,
	value: Option<TokenSecret>,
	token_type: Option<String>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AccessTokenBuilder {
	fn new(scopes: ScopeSet) -> Self {
		Self {
			scopes,
			value: None,
			token_type: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.value = Some(token.into());

		self
	}

	/// Sets the token type; defaults to `Bearer`.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Sets the issued-at instant; defaults to the current clock.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let value = self.value.ok_or(AccessTokenBuilderError::MissingAccessToken)?;

		if value.expose().is_empty() {
			return Err(AccessTokenBuilderError::MissingAccessToken);
		}

		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at
				.checked_add(delta)
				.ok_or(AccessTokenBuilderError::ExpiresInOutOfRange)?,
			(None, None) => return Err(AccessTokenBuilderError::MissingExpiry),
		};

		Ok(AccessToken {
			value,
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
			scopes: self.scopes,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
		})
	}
}
