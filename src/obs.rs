//! Observability helpers shared by token acquisition, key refresh, and service calls.
//!
//! Spans are named `lti_toolkit.flow` and carry `flow` and `stage` fields. Enable the
//! `metrics` feature to increment the `lti_toolkit_flow_total` counter for every
//! attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod refresh;
mod tracing;

pub use metrics::*;
pub use refresh::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Access-token acquisition performed by a backchannel.
	TokenAcquisition,
	/// Authenticated call to a platform service.
	ServiceCall,
	/// Channel pooling in the backchannel registry.
	ChannelPool,
	/// Fetch of a platform JWKS document.
	JwksRefresh,
	/// REST API token refresh in the platform token cache.
	PlatformTokenRefresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenAcquisition => "token_acquisition",
			FlowKind::ServiceCall => "service_call",
			FlowKind::ChannelPool => "channel_pool",
			FlowKind::JwksRefresh => "jwks_refresh",
			FlowKind::PlatformTokenRefresh => "platform_token_refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an observed operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or logged by a background worker.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
