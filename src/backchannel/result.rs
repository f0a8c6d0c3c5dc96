// self
use crate::_prelude::*;

/// Outcome of an outbound platform call.
///
/// Callers must branch on all three variants: a completed call may still be a declared
/// failure, and only [`Success`](Self::Success) carries a decoded payload.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonResult<T = serde_json::Value, E = serde_json::Value> {
	/// HTTP 200 with a body that decoded as `T`.
	Success {
		/// HTTP status code.
		status: u16,
		/// `Content-Type` reported by the platform.
		content_type: Option<String>,
		/// Decoded body.
		payload: T,
	},
	/// HTTP 4xx; the platform answered but refused the request.
	DeclaredFailure {
		/// HTTP status code.
		status: u16,
		/// `Content-Type` reported by the platform.
		content_type: Option<String>,
		/// Body as received.
		raw: String,
		/// Body decoded as `E`, when it decodes.
		payload: Option<E>,
	},
	/// Transport fault, unexpected status, or undecodable success body.
	Incomplete {
		/// What went wrong.
		message: String,
	},
}
impl<T, E> JsonResult<T, E>
where
	T: DeserializeOwned,
	E: DeserializeOwned,
{
	/// Classifies a received response by status and decodes its body.
	pub fn from_parts(status: u16, content_type: Option<String>, body: &str) -> Self {
		match status {
			200 => {
				let text = if body.trim().is_empty() { "null" } else { body };
				let de = &mut serde_json::Deserializer::from_str(text);
				let decoded: Result<T, _> = serde_path_to_error::deserialize(de);

				match decoded {
					Ok(payload) => Self::Success { status, content_type, payload },
					Err(e) => Self::incomplete(format!(
						"Response body could not be decoded at `{}`: {}",
						e.path(),
						e.inner()
					)),
				}
			},
			400..=499 => Self::DeclaredFailure {
				status,
				content_type,
				payload: serde_json::from_str(body).ok(),
				raw: body.to_owned(),
			},
			_ => Self::incomplete(format!("Platform answered with unexpected HTTP status {status}")),
		}
	}
}
impl<T, E> JsonResult<T, E> {
	/// Builds an [`Incomplete`](Self::Incomplete) result.
	pub fn incomplete(message: impl Into<String>) -> Self {
		Self::Incomplete { message: message.into() }
	}

	/// `true` when the platform produced a classifiable answer (success or declared failure).
	pub fn is_complete(&self) -> bool {
		!matches!(self, Self::Incomplete { .. })
	}

	/// `true` only for [`Success`](Self::Success).
	pub fn is_successful(&self) -> bool {
		matches!(self, Self::Success { .. })
	}

	/// HTTP status for complete results.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Success { status, .. } | Self::DeclaredFailure { status, .. } => Some(*status),
			Self::Incomplete { .. } => None,
		}
	}

	/// Decoded success payload.
	pub fn payload(&self) -> Option<&T> {
		match self {
			Self::Success { payload, .. } => Some(payload),
			_ => None,
		}
	}

	/// Consumes the result, keeping the success payload.
	pub fn into_payload(self) -> Option<T> {
		match self {
			Self::Success { payload, .. } => Some(payload),
			_ => None,
		}
	}

	/// Decoded failure payload.
	pub fn failure(&self) -> Option<&E> {
		match self {
			Self::DeclaredFailure { payload, .. } => payload.as_ref(),
			_ => None,
		}
	}

	/// Human-readable summary for logs; the message itself for incomplete results.
	pub fn message(&self) -> String {
		match self {
			Self::Success { status, .. } => format!("HTTP {status}"),
			Self::DeclaredFailure { status, raw, .. } => format!("HTTP {status}: {raw}"),
			Self::Incomplete { message } => message.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, PartialEq, Deserialize)]
	struct OAuthError {
		error: String,
	}

	#[test]
	fn ok_status_decodes_success() {
		let result: JsonResult = JsonResult::from_parts(
			200,
			Some("application/json".into()),
			r#"{"id":"https://lms.example.edu/lineitems/1"}"#,
		);

		assert!(result.is_complete());
		assert!(result.is_successful());
		assert_eq!(
			result.payload().and_then(|body| body["id"].as_str()),
			Some("https://lms.example.edu/lineitems/1")
		);
	}

	#[test]
	fn client_errors_are_declared_failures() {
		let result: JsonResult<serde_json::Value, OAuthError> =
			JsonResult::from_parts(400, None, r#"{"error":"invalid_client"}"#);

		assert!(result.is_complete());
		assert!(!result.is_successful());
		assert_eq!(result.status(), Some(400));
		assert_eq!(result.failure(), Some(&OAuthError { error: "invalid_client".into() }));
	}

	#[test]
	fn unparseable_failure_body_is_kept_raw() {
		let result: JsonResult = JsonResult::from_parts(404, None, "<html>not found</html>");

		match result {
			JsonResult::DeclaredFailure { raw, payload, .. } => {
				assert_eq!(raw, "<html>not found</html>");
				assert!(payload.is_none());
			},
			other => panic!("Unexpected result: {other:?}."),
		}
	}

	#[test]
	fn other_statuses_and_bad_bodies_are_incomplete() {
		let server_error: JsonResult = JsonResult::from_parts(503, None, "{}");
		let created: JsonResult = JsonResult::from_parts(201, None, "{}");
		let garbage: JsonResult<Vec<u8>> = JsonResult::from_parts(200, None, "{not json");

		assert!(!server_error.is_complete());
		assert!(!created.is_complete());
		assert!(!garbage.is_complete());
		assert!(garbage.message().contains("could not be decoded"));
	}

	#[test]
	fn empty_success_body_decodes_as_null() {
		let result: JsonResult = JsonResult::from_parts(200, None, "");

		assert_eq!(result.payload(), Some(&serde_json::Value::Null));
	}
}
