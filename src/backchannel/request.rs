// crates.io
use reqwest::Method;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Outbound call executed by a [`Backchannel`](crate::backchannel::Backchannel).
#[derive(Clone, Debug)]
pub struct ChannelRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL.
	pub url: Url,
	/// Query parameters appended to `url`.
	pub query: Vec<(String, String)>,
	/// `Accept` media type.
	pub accept: Option<String>,
	/// `Content-Type` of `body`.
	pub content_type: Option<String>,
	/// Request body.
	pub body: Option<Vec<u8>>,
	/// Explicit bearer credential that overrides the channel's own token.
	pub bearer: Option<TokenSecret>,
}
impl ChannelRequest {
	/// Starts a request with `method`.
	pub fn new(method: Method, url: Url) -> Self {
		Self {
			method,
			url,
			query: Vec::new(),
			accept: None,
			content_type: None,
			body: None,
			bearer: None,
		}
	}

	/// Starts a `GET`.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Starts a `POST`.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Starts a `PUT`.
	pub fn put(url: Url) -> Self {
		Self::new(Method::PUT, url)
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Sets the `Accept` media type.
	pub fn accept(mut self, media_type: impl Into<String>) -> Self {
		self.accept = Some(media_type.into());

		self
	}

	/// Attaches a JSON body sent as `media_type`.
	pub fn json_body(mut self, media_type: impl Into<String>, body: &serde_json::Value) -> Self {
		self.content_type = Some(media_type.into());
		self.body = Some(body.to_string().into_bytes());

		self
	}

	/// Attaches an `application/x-www-form-urlencoded` body.
	pub fn form_body(mut self, fields: &[(&str, &str)]) -> Self {
		let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(fields).finish();

		self.content_type = Some("application/x-www-form-urlencoded".into());
		self.body = Some(body.into_bytes());

		self
	}

	/// Uses `token` instead of the channel's own access token.
	pub fn bearer(mut self, token: TokenSecret) -> Self {
		self.bearer = Some(token);

		self
	}
}
