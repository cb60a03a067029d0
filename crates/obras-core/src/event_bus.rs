//! Broadcast event bus for inter-component communication.
//!
//! Consumers (the owner's order view, the staff list view, tests) each
//! hold an independent receiver; a slow receiver misses events rather
//! than blocking publishers.

use obras_types::ObrasEvent;
use tokio::sync::broadcast;

/// Default capacity of the event channel.
const DEFAULT_CAPACITY: usize = 256;

/// Event bus for publishing and subscribing to system events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ObrasEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers that received the event; zero
	/// subscribers is not an error.
	pub fn publish(&self, event: ObrasEvent) -> usize {
		self.sender.send(event).unwrap_or(0)
	}

	/// Creates a new independent subscription to the event stream.
	pub fn subscribe(&self) -> broadcast::Receiver<ObrasEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
