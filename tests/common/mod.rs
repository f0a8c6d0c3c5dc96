//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{path::PathBuf, time::Duration as StdDuration};
// crates.io
use httpmock::MockServer;
use lti_toolkit::{
	assertion::ToolSigningKey,
	auth::{ClientId, KeyId, PlatformId, ScopeSet},
	backchannel::{Backchannel, BackchannelKey, ChannelCredentials, ChannelKind},
	http::RoutingConfig,
	url::Url,
};

pub const TOOL_KEY_PEM: &str = include_str!("../fixtures/tool_key.pem");
pub const PLATFORM_KEY_PEM: &str = include_str!("../fixtures/platform_key.pem");
pub const CLIENT_ID: &str = "lti-tool-client";

pub fn test_routing() -> RoutingConfig {
	RoutingConfig::default()
		.with_connect_timeout(StdDuration::from_secs(2))
		.with_request_timeout(StdDuration::from_secs(5))
		.with_trust_all_servers(true)
}

pub fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

pub fn platform() -> PlatformId {
	PlatformId::new("lms.example.edu").expect("Platform fixture should be valid.")
}

pub fn client_id() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client id fixture should be valid.")
}

pub fn tool_signing_key(kid: &str) -> ToolSigningKey {
	let kid = KeyId::new(kid).expect("Key id fixture should be valid.");

	ToolSigningKey::from_pem(kid, TOOL_KEY_PEM).expect("Tool key fixture should load.")
}

pub fn platform_signing_key(kid: &str) -> ToolSigningKey {
	let kid = KeyId::new(kid).expect("Key id fixture should be valid.");

	ToolSigningKey::from_pem(kid, PLATFORM_KEY_PEM).expect("Platform key fixture should load.")
}

pub fn jwks_document(keys: &[&ToolSigningKey]) -> String {
	let set = lti_toolkit::jsonwebtoken::jwk::JwkSet {
		keys: keys.iter().map(|key| key.public_jwk()).collect(),
	};

	serde_json::to_string(&set).expect("JWKS fixture should serialize.")
}

pub fn scopes(values: &[&str]) -> ScopeSet {
	ScopeSet::new(values.iter().copied()).expect("Scope fixture should be valid.")
}

/// Channel to `service` whose tokens come from `token` via a signed assertion.
pub fn assertion_channel(server: &MockServer, service: &str, scope: &[&str]) -> Backchannel {
	assertion_channel_with(server, service, scope, &test_routing())
}

/// [`assertion_channel`] with custom routing.
pub fn assertion_channel_with(
	server: &MockServer,
	service: &str,
	scope: &[&str],
	routing: &RoutingConfig,
) -> Backchannel {
	let key = BackchannelKey::new(
		platform(),
		ChannelKind::AssignmentGrade,
		url(server, service),
		scopes(scope),
	);
	let credentials = ChannelCredentials::signed_assertion(
		url(server, "/token"),
		client_id(),
		Some(std::sync::Arc::new(tool_signing_key("tool-key-1"))),
		None,
		lti_toolkit::assertion::SignedAssertionBuilder::DEFAULT_LIFETIME,
	);

	Backchannel::new(key, credentials, routing).expect("Channel should build.")
}

/// Anonymous channel used for public fetches.
pub fn public_channel(server: &MockServer) -> Backchannel {
	let key = BackchannelKey::new(
		platform(),
		ChannelKind::PublicFetch,
		url(server, "/"),
		ScopeSet::default(),
	);

	Backchannel::new(key, ChannelCredentials::Anonymous, &test_routing())
		.expect("Channel should build.")
}

pub fn temp_dir(label: &str) -> PathBuf {
	let unique = format!(
		"lti_toolkit_it_{label}_{}_{}",
		std::process::id(),
		std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|elapsed| elapsed.as_nanos())
			.unwrap_or_default(),
	);

	std::env::temp_dir().join(unique)
}
