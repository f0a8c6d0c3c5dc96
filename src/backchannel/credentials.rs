// self
use crate::{
	_prelude::*,
	assertion::{SignedAssertionBuilder, ToolSigningKey},
	auth::{ClientId, TokenSecret},
};

/// How a channel obtains its access token.
#[derive(Clone, Debug)]
pub enum ChannelCredentials {
	/// Calls go out without an `Authorization` header unless a request carries its own.
	Anonymous,
	/// LTI services: `client_credentials` with a signed JWT client assertion.
	SignedAssertion {
		/// Platform token endpoint.
		token_url: Url,
		/// Client id the platform assigned to the tool.
		client_id: ClientId,
		/// Preconfigured assertion builder (subject, audience, key).
		assertion: SignedAssertionBuilder,
	},
	/// Platform REST APIs: `client_credentials` with HTTP Basic.
	SecretBasic {
		/// Platform token endpoint.
		token_url: Url,
		/// REST application id.
		client_id: ClientId,
		/// REST application secret.
		client_secret: TokenSecret,
	},
}
impl ChannelCredentials {
	/// Signed-assertion credentials whose audience is `token_url`.
	///
	/// `issuer` defaults to the client id when `None`.
	pub fn signed_assertion(
		token_url: Url,
		client_id: ClientId,
		signing_key: Option<Arc<ToolSigningKey>>,
		issuer: Option<String>,
		lifetime: Duration,
	) -> Self {
		let mut assertion = SignedAssertionBuilder::new()
			.subject(client_id.clone())
			.audience(token_url.clone())
			.signing_key(signing_key)
			.lifetime(lifetime);

		if let Some(issuer) = issuer {
			assertion = assertion.issuer(issuer);
		}

		Self::SignedAssertion { token_url, client_id, assertion }
	}

	/// Returns `true` when the channel must attach its own access token.
	pub fn carries_token(&self) -> bool {
		!matches!(self, Self::Anonymous)
	}
}
