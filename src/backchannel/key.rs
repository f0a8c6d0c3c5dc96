// self
use crate::{
	_prelude::*,
	auth::{PlatformId, ScopeSet},
};

/// Platform service a channel talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
	/// LTI Assignment and Grade Services (line items, scores).
	AssignmentGrade,
	/// LTI Names and Role Provisioning Services (memberships).
	NamesRoles,
	/// LTI dynamic registration (OpenID configuration, tool registration).
	DynamicRegistration,
	/// Platform-proprietary REST API authenticated with a shared secret.
	PlatformRest,
	/// Unauthenticated fetches such as platform JWKS documents.
	PublicFetch,
}
impl ChannelKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ChannelKind::AssignmentGrade => "ags",
			ChannelKind::NamesRoles => "nrps",
			ChannelKind::DynamicRegistration => "registration",
			ChannelKind::PlatformRest => "platform_rest",
			ChannelKind::PublicFetch => "public_fetch",
		}
	}
}
impl Display for ChannelKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Composite identity of a pooled channel.
///
/// Two requests share a channel only when every field matches, so a channel's cached token is
/// never used for a different endpoint or a wider scope than it was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackchannelKey {
	/// Platform the channel talks to.
	pub platform: PlatformId,
	/// Service kind.
	pub kind: ChannelKind,
	/// Service endpoint (or REST base URL).
	pub url: Url,
	/// Scopes requested for the channel's access token.
	pub scopes: ScopeSet,
}
impl BackchannelKey {
	/// Creates a key.
	pub fn new(platform: PlatformId, kind: ChannelKind, url: Url, scopes: ScopeSet) -> Self {
		Self { platform, kind, url, scopes }
	}
}
impl Display for BackchannelKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}:{}:{}", self.platform, self.kind, self.url)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::hash::DefaultHasher;
	// self
	use super::*;

	fn key(url: &str, scopes: &[&str]) -> BackchannelKey {
		BackchannelKey::new(
			PlatformId::new("lms.example.edu").expect("Platform fixture should be valid."),
			ChannelKind::AssignmentGrade,
			Url::parse(url).expect("Endpoint fixture should parse."),
			ScopeSet::new(scopes.iter().copied()).expect("Scope fixture should be valid."),
		)
	}

	fn hash_of(key: &BackchannelKey) -> u64 {
		let mut hasher = DefaultHasher::new();

		key.hash(&mut hasher);

		hasher.finish()
	}

	#[test]
	fn equality_is_structural() {
		let lhs = key("https://lms.example.edu/ags/1", &["b", "a"]);
		let rhs = key("https://lms.example.edu/ags/1", &["a", "b"]);

		assert_eq!(lhs, rhs);
		assert_eq!(hash_of(&lhs), hash_of(&rhs));
		assert_ne!(lhs, key("https://lms.example.edu/ags/2", &["a", "b"]));
		assert_ne!(lhs, key("https://lms.example.edu/ags/1", &["a"]));

		let mut other_kind = lhs.clone();

		other_kind.kind = ChannelKind::NamesRoles;

		assert_ne!(lhs, other_kind);
	}
}
