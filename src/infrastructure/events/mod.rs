//! Event bus for fire-and-forget notifications to out-of-process collaborators
//! (thumbnail broker, metadata extractor). Delivery is best-effort: a
//! subscriber-side failure is logged by the subscriber, never propagated back
//! to the publisher.

use tokio::sync::broadcast;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum Event {
	/// A new File row (with a primary entity) was committed and its
	/// extension is on the thumbnailable allowlist.
	FileCreated { file_id: i64, owner_id: i64 },
}

pub struct EventBus {
	sender: broadcast::Sender<Event>,
}

impl EventBus {
	pub fn new() -> Self {
		let (sender, _) = broadcast::channel(1024);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.sender.subscribe()
	}

	/// Publishes immediately. Callers that need to wait for a transaction to
	/// commit before the rest of the system can see the file should use
	/// `publish_delayed` instead.
	pub fn publish(&self, event: Event) {
		if self.sender.send(event).is_err() {
			warn!("event published with no subscribers listening");
		}
	}

	/// Schedules delivery after `delay`, on a detached task. Used by the sync
	/// engine and the upload finalize path so a `FileCreated` event is never
	/// observed before its own transaction has committed.
	pub fn publish_delayed(self: &std::sync::Arc<Self>, event: Event, delay: std::time::Duration) {
		let bus = self.clone();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			bus.publish(event);
		});
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}
