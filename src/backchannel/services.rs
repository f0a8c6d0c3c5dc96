//! Typed calls for the LTI Advantage services, dynamic registration, and platform REST APIs.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	backchannel::{Backchannel, ChannelRequest, JsonResult},
	error::ConfigError,
};

/// Media type of an AGS line item container.
pub const MEDIA_TYPE_LINE_ITEM_CONTAINER: &str = "application/vnd.ims.lis.v2.lineitemcontainer+json";
/// Media type of a single AGS line item.
pub const MEDIA_TYPE_LINE_ITEM: &str = "application/vnd.ims.lis.v2.lineitem+json";
/// Media type of an AGS score.
pub const MEDIA_TYPE_SCORE: &str = "application/vnd.ims.lis.v1.score+json";
/// Media type of an NRPS membership container.
pub const MEDIA_TYPE_MEMBERSHIP_CONTAINER: &str =
	"application/vnd.ims.lti-nrps.v2.membershipcontainer+json";
/// Generic JSON media type used for registration and REST calls.
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// AGS scope: manage line items.
pub const SCOPE_AGS_LINE_ITEM: &str = "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem";
/// AGS scope: read line items.
pub const SCOPE_AGS_LINE_ITEM_READONLY: &str =
	"https://purl.imsglobal.org/spec/lti-ags/scope/lineitem.readonly";
/// AGS scope: read results.
pub const SCOPE_AGS_RESULT_READONLY: &str =
	"https://purl.imsglobal.org/spec/lti-ags/scope/result.readonly";
/// AGS scope: publish scores.
pub const SCOPE_AGS_SCORE: &str = "https://purl.imsglobal.org/spec/lti-ags/scope/score";
/// NRPS scope: read context memberships.
pub const SCOPE_NRPS_MEMBERSHIP_READONLY: &str =
	"https://purl.imsglobal.org/spec/lti-nrps/scope/contextmembership.readonly";

impl Backchannel {
	/// Lists the line items of the context's line item container.
	pub async fn line_items(&self, container: &Url) -> Result<JsonResult> {
		self.execute(ChannelRequest::get(container.clone()).accept(MEDIA_TYPE_LINE_ITEM_CONTAINER))
			.await
	}

	/// Creates a line item in `container`.
	pub async fn post_line_item(
		&self,
		container: &Url,
		line_item: &serde_json::Value,
	) -> Result<JsonResult> {
		let request = ChannelRequest::post(container.clone())
			.accept(MEDIA_TYPE_LINE_ITEM)
			.json_body(MEDIA_TYPE_LINE_ITEM, line_item);

		self.execute(request).await
	}

	/// Publishes a score to the `scores` endpoint of `line_item`.
	pub async fn post_score(&self, line_item: &Url, score: &serde_json::Value) -> Result<JsonResult> {
		let request = ChannelRequest::post(scores_url(line_item)).json_body(MEDIA_TYPE_SCORE, score);

		self.execute(request).await
	}

	/// Reads the context membership container.
	pub async fn memberships(&self, endpoint: &Url) -> Result<JsonResult> {
		self.execute(ChannelRequest::get(endpoint.clone()).accept(MEDIA_TYPE_MEMBERSHIP_CONTAINER))
			.await
	}

	/// Fetches a public JSON document without attaching any credential.
	pub async fn fetch_public_json<T>(&self, url: &Url) -> JsonResult<T>
	where
		T: DeserializeOwned,
	{
		self.send(ChannelRequest::get(url.clone()).accept(MEDIA_TYPE_JSON), None).await
	}

	/// Reads a platform's OpenID configuration during dynamic registration.
	pub async fn openid_configuration(&self, url: &Url) -> JsonResult {
		self.fetch_public_json(url).await
	}

	/// Registers the tool at the platform's registration endpoint.
	///
	/// `registration_token` is the one-time bearer token handed over in the registration
	/// initiation request, when the platform supplied one.
	pub async fn register_tool(
		&self,
		endpoint: &Url,
		registration_token: Option<&TokenSecret>,
		registration: &serde_json::Value,
	) -> Result<JsonResult> {
		let mut request = ChannelRequest::post(endpoint.clone())
			.accept(MEDIA_TYPE_JSON)
			.json_body(MEDIA_TYPE_JSON, registration);

		if let Some(token) = registration_token {
			request = request.bearer(token.clone());
		}

		self.execute(request).await
	}

	/// `GET` against a path under the channel's REST base URL.
	pub async fn rest_get(&self, path: &str, query: &[(&str, &str)]) -> Result<JsonResult> {
		let mut request = ChannelRequest::get(self.rest_url(path)?).accept(MEDIA_TYPE_JSON);

		for (name, value) in query {
			request = request.query(*name, *value);
		}

		self.execute(request).await
	}

	/// `PUT` of a JSON body against a path under the channel's REST base URL.
	pub async fn rest_put(&self, path: &str, body: &serde_json::Value) -> Result<JsonResult> {
		let request = ChannelRequest::put(self.rest_url(path)?)
			.accept(MEDIA_TYPE_JSON)
			.json_body(MEDIA_TYPE_JSON, body);

		self.execute(request).await
	}

	fn rest_url(&self, path: &str) -> Result<Url> {
		self.key().url.join(path).map_err(|e| ConfigError::invalid_endpoint(path, e).into())
	}
}

/// `{line_item}/scores`, keeping the line item's query string.
pub fn scores_url(line_item: &Url) -> Url {
	let mut url = line_item.clone();
	let path = format!("{}/scores", line_item.path().trim_end_matches('/'));

	url.set_path(&path);

	url
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scores_url_appends_segment_and_keeps_query() {
		let line_item = Url::parse("https://lms.example.edu/api/lti/courses/7/line_items/3?type=x")
			.expect("Line item URL should parse.");

		assert_eq!(
			scores_url(&line_item).as_str(),
			"https://lms.example.edu/api/lti/courses/7/line_items/3/scores?type=x"
		);

		let trailing = Url::parse("https://lms.example.edu/line_items/3/")
			.expect("Line item URL should parse.");

		assert_eq!(scores_url(&trailing).as_str(), "https://lms.example.edu/line_items/3/scores");
	}
}
