//! Access tokens issued by platform token endpoints.

pub mod access;
pub mod response;
pub mod secret;
