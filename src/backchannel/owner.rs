// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle for a component that keeps pooled channels alive.
///
/// Each request handler (or any other long-lived component) allocates one handle, passes it to
/// [`BackchannelRegistry::acquire`](crate::backchannel::BackchannelRegistry::acquire), and hands
/// it to [`release`](crate::backchannel::BackchannelRegistry::release) when it is torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(u64);
impl OwnerId {
	/// Allocates a process-unique handle.
	pub fn allocate() -> Self {
		Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
	}
}
impl Display for OwnerId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "owner-{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn handles_are_unique() {
		let handles: HashSet<OwnerId> = (0..64).map(|_| OwnerId::allocate()).collect();

		assert_eq!(handles.len(), 64);
	}
}
