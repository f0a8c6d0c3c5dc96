//! Outbound HTTP transport shared by backchannels, key fetches, and token exchanges.
//!
//! Every client is built from a [`RoutingConfig`] so each call carries bounded connect and
//! request timeouts and, when configured, goes through the tool's outbound proxy. Token
//! exchanges go through [`InstrumentedHandle`], which implements the `oauth2` crate's
//! [`AsyncHttpClient`] and records the response status in a [`ResponseMetadataSlot`] so
//! error mapping can report it.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{Proxy, redirect::Policy};
// self
use crate::{_prelude::*, error::ConfigError};

/// Proxy, certificate, and timeout settings applied to every outbound client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingConfig {
	/// Outbound proxy for all schemes.
	pub proxy: Option<Url>,
	/// Accept invalid TLS certificates. Development only.
	pub trust_all_servers: bool,
	/// TCP/TLS connect timeout.
	pub connect_timeout: StdDuration,
	/// Whole-request timeout, including reading the body.
	pub request_timeout: StdDuration,
}
impl RoutingConfig {
	/// Routes all calls through `proxy`.
	pub fn with_proxy(mut self, proxy: Url) -> Self {
		self.proxy = Some(proxy);

		self
	}

	/// Toggles acceptance of invalid TLS certificates.
	pub fn with_trust_all_servers(mut self, trust: bool) -> Self {
		self.trust_all_servers = trust;

		self
	}

	/// Overrides the connect timeout.
	pub fn with_connect_timeout(mut self, timeout: StdDuration) -> Self {
		self.connect_timeout = timeout;

		self
	}

	/// Overrides the request timeout.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}
}
impl Default for RoutingConfig {
	fn default() -> Self {
		Self {
			proxy: None,
			trust_all_servers: false,
			connect_timeout: StdDuration::from_secs(10),
			request_timeout: StdDuration::from_secs(30),
		}
	}
}

/// Status captured from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so routing behavior lives in one place.
///
/// Redirects are never followed: token endpoints must answer directly, and service calls
/// carry bearer credentials that must not leak to another origin.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client honoring `routing`.
	pub fn from_routing(routing: &RoutingConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.redirect(Policy::none())
			.connect_timeout(routing.connect_timeout)
			.timeout(routing.request_timeout);

		if let Some(proxy) = &routing.proxy {
			builder = builder.proxy(Proxy::all(proxy.as_str())?);
		}
		if routing.trust_all_servers {
			tracing::warn!("Outbound TLS certificate validation is disabled; use only in development.");

			builder = builder.danger_accept_invalid_certs(true);
		}

		Ok(Self(builder.build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented handle that captures response metadata into `slot`.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// [`AsyncHttpClient`] adapter handed to the `oauth2` crate for token exchanges.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn routing_defaults_are_bounded() {
		let routing = RoutingConfig::default();

		assert_eq!(routing.connect_timeout, StdDuration::from_secs(10));
		assert_eq!(routing.request_timeout, StdDuration::from_secs(30));
		assert!(routing.proxy.is_none());
	}

	#[test]
	fn client_builds_with_proxy_and_relaxed_tls() {
		let proxy = Url::parse("http://proxy.internal:3128").expect("Proxy URL should parse.");
		let routing = RoutingConfig::default().with_proxy(proxy).with_trust_all_servers(true);

		assert!(ReqwestHttpClient::from_routing(&routing).is_ok());
	}

	#[test]
	fn metadata_slot_is_consumed_on_take() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(400) });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(400));
		assert!(slot.take().is_none());
	}
}
