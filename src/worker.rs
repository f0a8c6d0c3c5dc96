//! Background workers driving periodic key set and token refreshes.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::_prelude::*;

const MIN_PERIOD: StdDuration = StdDuration::from_millis(1);

/// Handle to a spawned background worker.
///
/// The worker is aborted when the handle is stopped or dropped.
#[derive(Debug)]
pub struct BackgroundTask {
	name: &'static str,
	handle: JoinHandle<()>,
}
impl BackgroundTask {
	/// Spawns `cycle` every `period`, starting after `initial_delay`.
	///
	/// Must be called from within a Tokio runtime. A cycle that overruns its period delays the
	/// next one instead of triggering a burst of catch-up cycles. A zero period is raised to one
	/// millisecond.
	pub fn spawn_periodic<F, Fut>(
		name: &'static str,
		initial_delay: StdDuration,
		period: StdDuration,
		mut cycle: F,
	) -> Self
	where
		F: 'static + Send + FnMut() -> Fut,
		Fut: 'static + Send + Future<Output = ()>,
	{
		let period = period.max(MIN_PERIOD);
		let handle = tokio::spawn(async move {
			let mut ticker = time::interval_at(Instant::now() + initial_delay, period);

			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				ticker.tick().await;
				tracing::debug!(worker = name, "Background cycle started.");
				cycle().await;
			}
		});

		tracing::info!(worker = name, ?initial_delay, ?period, "Started background worker.");

		Self { name, handle }
	}

	/// Worker name used in logs.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Returns `true` once the worker has stopped.
	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Aborts the worker and waits for it to wind down.
	pub async fn stop(mut self) {
		self.handle.abort();

		let _ = (&mut self.handle).await;

		tracing::info!(worker = self.name, "Stopped background worker.");
	}
}
impl Drop for BackgroundTask {
	fn drop(&mut self) {
		self.handle.abort();
	}
}
