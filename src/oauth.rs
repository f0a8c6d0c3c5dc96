//! Client-credentials token exchanges driven through the `oauth2` crate.

// crates.io
use oauth2::{
	ClientId as OAuthClientId, ClientSecret, HttpClientError, RequestTokenError, Scope,
	TokenResponse as _, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet, TokenResponse, TokenSecret},
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

/// `client_assertion_type` value for RFC 7523 JWT bearer client authentication.
pub(crate) const CLIENT_ASSERTION_TYPE: &str =
	"urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// How the tool proves its identity to the token endpoint.
#[derive(Clone, Copy)]
pub(crate) enum ClientAuthentication<'a> {
	/// Signed JWT sent as `client_assertion`.
	Assertion(&'a str),
	/// Shared secret sent with HTTP Basic.
	SecretBasic(&'a TokenSecret),
}

/// Parameters shared by both client-credentials variants.
pub(crate) struct TokenExchange<'a> {
	pub(crate) http: &'a ReqwestHttpClient,
	pub(crate) token_url: &'a Url,
	pub(crate) client_id: &'a ClientId,
	pub(crate) scopes: &'a ScopeSet,
	pub(crate) fallback_lifetime: Duration,
}
impl TokenExchange<'_> {
	/// Performs the `client_credentials` grant and converts the response into an
	/// [`AccessToken`].
	pub(crate) async fn exchange(&self, auth: ClientAuthentication<'_>) -> Result<AccessToken> {
		let mut client = BasicClient::new(OAuthClientId::new(self.client_id.to_string()))
			.set_token_uri(TokenUrl::from_url(self.token_url.clone()));

		if let ClientAuthentication::SecretBasic(secret) = auth {
			client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}

		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http.instrumented(meta.clone());
		let mut request = client.exchange_client_credentials();

		for scope in self.scopes.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}
		if let ClientAuthentication::Assertion(assertion) = auth {
			request = request
				.add_extra_param("client_assertion_type", CLIENT_ASSERTION_TYPE)
				.add_extra_param("client_assertion", assertion);
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let issued_at = OffsetDateTime::now_utc();
		let wire = TokenResponse {
			access_token: TokenSecret::new(response.access_token().secret().to_owned()),
			token_type: response.token_type().as_ref().to_owned(),
			expires_in: response.expires_in().map(|lifetime| lifetime.as_secs()),
			refresh_token: response
				.refresh_token()
				.map(|refresh| TokenSecret::new(refresh.secret().to_owned())),
			scope: response.scopes().map(|granted| {
				granted.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" ")
			}),
		};

		AccessToken::from_response(wire, self.scopes, issued_at, self.fallback_lifetime)
			.map_err(|e| ConfigError::from(e).into())
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(response, status),
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			if inner.is_builder() {
				ConfigError::from(*inner).into()
			} else {
				TransportError::from(*inner).into()
			},
		RequestTokenError::Request(HttpClientError::Http(inner)) => ConfigError::from(inner).into(),
		RequestTokenError::Request(HttpClientError::Io(inner)) => TransportError::Io(inner).into(),
		RequestTokenError::Request(HttpClientError::Other(message)) => TransientError::Endpoint {
			message: format!("HTTP client error while calling the token endpoint: {message}"),
			status,
		}
		.into(),
		RequestTokenError::Request(_) => TransientError::Endpoint {
			message: "HTTP client error while calling the token endpoint".into(),
			status,
		}
		.into(),
		RequestTokenError::Parse(source, _body) =>
			TransientError::TokenResponseParse { source, status }.into(),
		RequestTokenError::Other(message) => TransientError::Endpoint { message, status }.into(),
	}
}

fn map_server_response(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let code = response.error().as_ref();
	let reason = match response.error_description() {
		Some(description) => format!("{code} ({description})"),
		None => code.to_owned(),
	};

	Error::TokenRejected { reason, status }
}
