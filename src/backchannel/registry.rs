// self
use crate::{
	_prelude::*,
	backchannel::{Backchannel, BackchannelKey, ChannelCredentials, OwnerId},
	http::RoutingConfig,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Shares one [`Backchannel`] per [`BackchannelKey`] among its owners.
///
/// Map mutation happens under one lock, so an acquire racing a release of the same key either
/// joins the surviving channel or creates a fresh one, never a half-removed instance. Channels
/// are built outside that lock; lookups of other keys never wait on a client being built.
#[derive(Debug)]
pub struct BackchannelRegistry {
	routing: RoutingConfig,
	channels: Mutex<HashMap<BackchannelKey, Arc<Backchannel>>>,
}
impl BackchannelRegistry {
	/// Creates an empty registry whose channels honor `routing`.
	pub fn new(routing: RoutingConfig) -> Self {
		Self { routing, channels: Mutex::new(HashMap::new()) }
	}

	/// Routing applied to newly created channels.
	pub fn routing(&self) -> &RoutingConfig {
		&self.routing
	}

	/// Returns the channel for `key`, creating it with `credentials` when absent, and records
	/// `owner` on it.
	///
	/// `credentials` runs only when no channel is pooled for `key`.
	pub fn acquire<F>(
		&self,
		owner: OwnerId,
		key: &BackchannelKey,
		credentials: F,
	) -> Result<Arc<Backchannel>>
	where
		F: FnOnce() -> Result<ChannelCredentials>,
	{
		self.acquire_with(owner, key, |routing| {
			Backchannel::new(key.clone(), credentials()?, routing)
		})
	}

	/// Like [`acquire`](Self::acquire), with full control over how a missing channel is built.
	///
	/// `build` runs without holding the registry lock. When another caller pools a channel for
	/// the same key meanwhile, `owner` joins that channel and the freshly built one is dropped.
	pub fn acquire_with<F>(
		&self,
		owner: OwnerId,
		key: &BackchannelKey,
		build: F,
	) -> Result<Arc<Backchannel>>
	where
		F: FnOnce(&RoutingConfig) -> Result<Backchannel>,
	{
		const KIND: FlowKind = FlowKind::ChannelPool;

		let _span = FlowSpan::new(KIND, "acquire").entered();

		if let Some(channel) = self.join(owner, key) {
			return Ok(channel);
		}

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let built = match build(&self.routing) {
			Ok(channel) => Arc::new(channel),
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				return Err(e);
			},
		};
		let mut channels = self.channels.lock();
		let channel = Arc::clone(channels.entry(key.clone()).or_insert_with(|| {
			tracing::debug!(channel = %key, %owner, "Created backchannel.");

			built
		}));

		channel.add_owner(owner);
		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		Ok(channel)
	}

	fn join(&self, owner: OwnerId, key: &BackchannelKey) -> Option<Arc<Backchannel>> {
		let channels = self.channels.lock();
		let channel = channels.get(key)?;

		channel.add_owner(owner);

		Some(Arc::clone(channel))
	}

	/// Removes `owner` from every channel and drops channels left without owners.
	///
	/// Returns how many channels were dropped.
	pub fn release(&self, owner: OwnerId) -> usize {
		let _span = FlowSpan::new(FlowKind::ChannelPool, "release").entered();
		let mut channels = self.channels.lock();
		let before = channels.len();

		channels.retain(|key, channel| {
			channel.remove_owner(owner);

			let keep = channel.has_owners();

			if !keep {
				tracing::debug!(channel = %key, %owner, "Dropped backchannel without owners.");
			}

			keep
		});

		before - channels.len()
	}

	/// Pooled channel for `key`, if any.
	pub fn get(&self, key: &BackchannelKey) -> Option<Arc<Backchannel>> {
		self.channels.lock().get(key).cloned()
	}

	/// Returns `true` if a channel is pooled for `key`.
	pub fn contains(&self, key: &BackchannelKey) -> bool {
		self.channels.lock().contains_key(key)
	}

	/// Number of pooled channels.
	pub fn len(&self) -> usize {
		self.channels.lock().len()
	}

	/// Returns `true` when no channel is pooled.
	pub fn is_empty(&self) -> bool {
		self.channels.lock().is_empty()
	}
}
