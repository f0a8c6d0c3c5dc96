//! Wire form of a client-credentials token endpoint response.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// JSON body returned by a platform token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Token type; platforms that omit it are treated as issuing bearer tokens.
	#[serde(default = "default_token_type")]
	pub token_type: String,
	/// Lifetime in seconds, relative to the moment the response was received.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
	/// Optional refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Space-delimited scopes actually granted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
}

fn default_token_type() -> String {
	"Bearer".into()
}
