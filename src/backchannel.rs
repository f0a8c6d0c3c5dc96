//! Pooled, authenticated server-to-server channels to learning platforms.
//!
//! A [`Backchannel`] wraps one platform service endpoint together with the credentials needed
//! to obtain an access token for it. Channels are expensive (signing material, cached tokens,
//! an HTTP client), so a [`BackchannelRegistry`] shares one instance per [`BackchannelKey`]
//! among every [`OwnerId`] that asked for it and drops the instance when the last owner
//! releases it.

mod channel;
mod credentials;
mod key;
mod owner;
mod registry;
mod request;
mod result;
pub mod services;

pub use channel::Backchannel;
pub use credentials::ChannelCredentials;
pub use key::{BackchannelKey, ChannelKind};
pub use owner::OwnerId;
pub use registry::BackchannelRegistry;
pub use request::ChannelRequest;
pub use result::JsonResult;
