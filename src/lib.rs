//! LTI 1.3 trust and credential toolkit: pooled platform backchannels, signed client
//! assertions, cached access tokens, and self-refreshing JWKS key stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod assertion;
pub mod auth;
pub mod backchannel;
pub mod config;
pub mod error;
pub mod http;
pub mod jwks;
pub mod obs;
pub mod platform;
pub mod store;
pub mod tool;
pub mod toolkit;
pub mod worker;

mod oauth;

#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{assertion::ToolSigningKey, auth::KeyId, http::RoutingConfig};

	/// PKCS#8 private key used as the tool's own signing key in tests.
	pub const TOOL_KEY_PEM: &str = include_str!("../tests/fixtures/tool_key.pem");
	/// PKCS#8 private key standing in for a platform that signs launches.
	pub const PLATFORM_KEY_PEM: &str = include_str!("../tests/fixtures/platform_key.pem");

	/// Routing profile with short timeouts and no proxy, suitable for `httpmock` servers.
	pub fn test_routing() -> RoutingConfig {
		RoutingConfig::default()
			.with_connect_timeout(std::time::Duration::from_secs(2))
			.with_request_timeout(std::time::Duration::from_secs(5))
			.with_trust_all_servers(true)
	}

	/// Loads the tool signing key fixture under the provided key id.
	pub fn tool_signing_key(kid: &str) -> ToolSigningKey {
		let kid = KeyId::new(kid).expect("Failed to build tool key id fixture.");

		ToolSigningKey::from_pem(kid, TOOL_KEY_PEM).expect("Failed to load tool key fixture.")
	}

	/// Loads the platform signing key fixture under the provided key id.
	pub fn platform_signing_key(kid: &str) -> ToolSigningKey {
		let kid = KeyId::new(kid).expect("Failed to build platform key id fixture.");

		ToolSigningKey::from_pem(kid, PLATFORM_KEY_PEM)
			.expect("Failed to load platform key fixture.")
	}

	/// Renders a JWKS document publishing the public halves of `keys`.
	pub fn jwks_document(keys: &[&ToolSigningKey]) -> String {
		let set = jsonwebtoken::jwk::JwkSet { keys: keys.iter().map(|key| key.public_jwk()).collect() };

		serde_json::to_string(&set).expect("Failed to serialize JWKS fixture.")
	}

	/// Returns a unique scratch directory under the system temp dir.
	pub fn temp_dir(label: &str) -> std::path::PathBuf {
		let unique = format!(
			"lti_toolkit_{label}_{}_{}",
			std::process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		std::env::temp_dir().join(unique)
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
