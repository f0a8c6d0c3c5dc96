//! The tool's RSA signing key and the short-lived client assertions it signs.
//!
//! A platform's token endpoint authenticates the tool with an RS256 JWT whose header names
//! the signing key (`kid`). The platform verifies that JWT against the tool's published key
//! set, which [`ToolSigningKey::public_jwks`] renders.

// std
use std::path::Path;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
	Algorithm, EncodingKey, Header,
	jwk::{Jwk, JwkSet},
};
use rand::{Rng, distr::Alphanumeric};
use rsa::{
	RsaPrivateKey, pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts,
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId},
	error::SigningError,
};

const JTI_LEN: usize = 32;

/// RSA private key the tool signs assertions with, plus its public JWK.
#[derive(Clone)]
pub struct ToolSigningKey {
	kid: KeyId,
	encoding: EncodingKey,
	jwk: Jwk,
}
impl ToolSigningKey {
	/// Parses a PKCS#8 or PKCS#1 PEM private key published under `kid`.
	pub fn from_pem(kid: KeyId, pem: &str) -> Result<Self, SigningError> {
		let private = match RsaPrivateKey::from_pkcs8_pem(pem) {
			Ok(key) => key,
			Err(pkcs8) => RsaPrivateKey::from_pkcs1_pem(pem)
				.map_err(|_| SigningError::UnusableKey { reason: pkcs8.to_string() })?,
		};
		let encoding = EncodingKey::from_rsa_pem(pem.as_bytes())
			.map_err(|e| SigningError::UnusableKey { reason: e.to_string() })?;
		let public = private.to_public_key();
		let jwk = serde_json::from_value(serde_json::json!({
			"kty": "RSA",
			"kid": kid.as_ref(),
			"alg": "RS256",
			"use": "sig",
			"n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
			"e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
		}))
		.map_err(|e| SigningError::UnusableKey { reason: e.to_string() })?;

		Ok(Self { kid, encoding, jwk })
	}

	/// Reads [`from_pem`](Self::from_pem) input from a file.
	pub fn from_pem_file(kid: KeyId, path: impl AsRef<Path>) -> Result<Self, SigningError> {
		let path = path.as_ref();
		let pem = std::fs::read_to_string(path).map_err(|e| SigningError::UnusableKey {
			reason: format!("failed to read {}: {e}", path.display()),
		})?;

		Self::from_pem(kid, &pem)
	}

	/// Key id placed in the JWT header.
	pub fn kid(&self) -> &KeyId {
		&self.kid
	}

	/// Public half of the key as a JWK.
	pub fn public_jwk(&self) -> Jwk {
		self.jwk.clone()
	}

	/// JWKS document platforms fetch to verify the tool's assertions.
	pub fn public_jwks(&self) -> JwkSet {
		JwkSet { keys: vec![self.public_jwk()] }
	}
}
impl Debug for ToolSigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ToolSigningKey").field("kid", &self.kid).finish_non_exhaustive()
	}
}

/// Claims carried by a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
	/// Issuer; the tool.
	pub iss: String,
	/// Subject; the client id the platform assigned to the tool.
	pub sub: String,
	/// Audience; the platform token endpoint.
	pub aud: String,
	/// Issued-at, seconds since the epoch.
	pub iat: i64,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
	/// Unique token id so the platform can reject replays.
	pub jti: String,
}

/// Builds and signs RS256 client assertions for the `client_credentials` grant.
#[derive(Clone, Debug)]
pub struct SignedAssertionBuilder {
	issuer: Option<String>,
	subject: Option<ClientId>,
	audience: Option<Url>,
	signing_key: Option<Arc<ToolSigningKey>>,
	lifetime: Duration,
}
impl SignedAssertionBuilder {
	/// Default validity window of a signed assertion.
	pub const DEFAULT_LIFETIME: Duration = Duration::minutes(5);

	/// Creates an empty builder with the default lifetime.
	pub fn new() -> Self {
		Self {
			issuer: None,
			subject: None,
			audience: None,
			signing_key: None,
			lifetime: Self::DEFAULT_LIFETIME,
		}
	}

	/// Sets `iss`; defaults to the subject client id.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Sets `sub`.
	pub fn subject(mut self, client_id: ClientId) -> Self {
		self.subject = Some(client_id);

		self
	}

	/// Sets `aud`, normally the platform token endpoint.
	pub fn audience(mut self, audience: Url) -> Self {
		self.audience = Some(audience);

		self
	}

	/// Sets the key that signs the assertion and names the header `kid`.
	pub fn signing_key(mut self, key: Option<Arc<ToolSigningKey>>) -> Self {
		self.signing_key = key;

		self
	}

	/// Overrides the validity window.
	pub fn lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime;

		self
	}

	/// Signs an assertion issued now.
	pub fn sign(&self) -> Result<String, SigningError> {
		self.sign_at(OffsetDateTime::now_utc())
	}

	/// Signs an assertion issued at `now`.
	pub fn sign_at(&self, now: OffsetDateTime) -> Result<String, SigningError> {
		let key = self.signing_key.as_ref().ok_or(SigningError::MissingKey)?;
		let subject = self.subject.as_ref().ok_or(SigningError::MissingClaim { claim: "sub" })?;
		let audience = self.audience.as_ref().ok_or(SigningError::MissingClaim { claim: "aud" })?;
		let claims = ClientAssertionClaims {
			iss: self.issuer.clone().unwrap_or_else(|| subject.to_string()),
			sub: subject.to_string(),
			aud: audience.to_string(),
			iat: now.unix_timestamp(),
			exp: (now + self.lifetime).unix_timestamp(),
			jti: rand::rng().sample_iter(Alphanumeric).take(JTI_LEN).map(char::from).collect(),
		};
		let mut header = Header::new(Algorithm::RS256);

		header.kid = Some(key.kid().to_string());

		jsonwebtoken::encode(&header, &claims, &key.encoding).map_err(SigningError::Encode)
	}
}
impl Default for SignedAssertionBuilder {
	fn default() -> Self {
		Self::new()
	}
}
