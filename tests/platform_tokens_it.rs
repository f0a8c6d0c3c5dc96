mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use lti_toolkit::{
	auth::{AccessToken, ClientId, PlatformId},
	config::RestApiConfig,
	error::Error,
	platform::{PlatformRestClient, PlatformTokenCache},
};
use time::Duration;
// self
use common::*;

const TOKEN_PATH: &str = "/learn/api/public/v1/oauth2/token";
const BASIC_AUTH: &str = "Basic cmVzdC1jbGllbnQ6cmVzdC1zZWNyZXQ=";

fn mock_platform(server: &MockServer) -> PlatformId {
	PlatformId::new(server.address().to_string()).expect("Mock platform host should be valid.")
}

fn cache() -> Arc<PlatformTokenCache> {
	let settings = RestApiConfig::new(
		ClientId::new("rest-client").expect("Client id fixture should be valid."),
		"rest-secret",
	)
	.with_scheme("http");

	Arc::new(PlatformTokenCache::new(settings, &test_routing()).expect("Cache should build."))
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", BASIC_AUTH)
				.body_includes("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body("{\"access_token\":\"rest-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}");
		})
		.await;
	let cache = cache();
	let platform = mock_platform(&server);
	let (first, second) = tokio::join!(cache.get_token(&platform), cache.get_token(&platform));
	let first = first.expect("First caller should receive a token.");
	let second = second.expect("Second caller should receive a token.");

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(first.value.expose(), "rest-token");
	assert_eq!(cache.platforms(), vec![platform.clone()]);

	let again = cache.get_token(&platform).await.expect("Cached token should be returned.");

	assert!(Arc::ptr_eq(&first, &again));

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_expiry_falls_back_to_configured_lifetime() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"short\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let cache = cache();
	let token = cache.get_token(&mock_platform(&server)).await.expect("Token should be issued.");

	assert_eq!(token.expires_at - token.issued_at, Duration::seconds(60));
}

#[tokio::test]
async fn oversized_expiry_is_capped_instead_of_crashing_the_caller() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"x\",\"token_type\":\"Bearer\",\"expires_in\":1000000000000}",
			);
		})
		.await;
	let cache = cache();
	let platform = mock_platform(&server);
	let worker = {
		let cache = Arc::clone(&cache);

		tokio::spawn(async move { cache.get_token(&platform).await })
	};
	let token = worker
		.await
		.expect("Token task should not panic.")
		.expect("Token should be issued.");
	let cap = Duration::seconds(
		i64::try_from(AccessToken::MAX_LIFETIME_SECS).expect("Cap should fit in i64."),
	);

	assert_eq!(token.expires_at - token.issued_at, cap);
}

#[tokio::test]
async fn rejected_credentials_are_not_cached() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let cache = cache();
	let platform = mock_platform(&server);
	let err = cache.get_token(&platform).await.expect_err("Rejected credentials should fail.");

	assert!(matches!(err, Error::TokenRejected { .. }), "Unexpected error: {err:?}.");
	assert!(cache.cached_token(&platform).is_none());
	assert_eq!(cache.metrics().failures(), 1);

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn background_pass_renews_only_tokens_expiring_before_the_next_cycle() {
	let server = MockServer::start_async().await;
	let short = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"short\",\"token_type\":\"Bearer\",\"expires_in\":30}");
		})
		.await;
	let cache = cache();
	let platform = mock_platform(&server);

	cache.get_token(&platform).await.expect("Short-lived token should be issued.");

	// A 30 second token expires before the 60 second cycle comes around again.
	assert_eq!(cache.refresh_idle_platforms().await, 1);

	short.assert_calls_async(2).await;

	let long_server = MockServer::start_async().await;
	let long = long_server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"long\",\"token_type\":\"Bearer\",\"expires_in\":3600}");
		})
		.await;
	let long_lived = mock_platform(&long_server);

	cache.get_token(&long_lived).await.expect("Long-lived token should be issued.");

	// Only the short-lived platform is renewed again.
	assert_eq!(cache.refresh_idle_platforms().await, 1);

	long.assert_calls_async(1).await;
	short.assert_calls_async(3).await;
}

#[tokio::test]
async fn rest_client_sends_cached_bearer() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).header("authorization", BASIC_AUTH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"rest-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}");
		})
		.await;
	let course = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/learn/api/public/v3/courses/_42_1")
				.query_param("fields", "id,name")
				.header("authorization", "Bearer rest-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"_42_1\",\"name\":\"Essay Writing\"}");
		})
		.await;
	let grade = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/learn/api/public/v2/courses/_42_1/gradebook/columns/_7_1/users/_9_1")
				.header("authorization", "Bearer rest-token")
				.header("content-type", "application/json")
				.body_includes("\"score\":8");
			then.status(404)
				.header("content-type", "application/json")
				.body("{\"status\":404,\"message\":\"User not enrolled.\"}");
		})
		.await;
	let cache = cache();
	let client = PlatformRestClient::new(mock_platform(&server), Arc::clone(&cache), &test_routing())
		.expect("Client should build.");
	let fetched = client
		.get("learn/api/public/v3/courses/_42_1", &[("fields", "id,name")])
		.await
		.expect("Course fetch should get a token.");

	assert!(fetched.is_successful());
	assert_eq!(
		fetched.payload().and_then(|course| course["name"].as_str()),
		Some("Essay Writing")
	);

	let updated = client
		.put(
			"learn/api/public/v2/courses/_42_1/gradebook/columns/_7_1/users/_9_1",
			&serde_json::json!({ "score": 8 }),
		)
		.await
		.expect("Grade update should get a token.");

	assert!(updated.is_complete());
	assert!(!updated.is_successful());
	assert_eq!(updated.status(), Some(404));

	token.assert_calls_async(1).await;
	course.assert_async().await;
	grade.assert_async().await;
}
