//! Event types for inter-component communication.
//!
//! Events flow through a broadcast bus so that independent observers (the
//! owner's order view, the staff list view, tests) can react to state
//! changes without polling the store.

use serde::{Deserialize, Serialize};

use crate::{Order, OrderStatus};

/// Main event type encompassing all system events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObrasEvent {
	/// Events from the order lifecycle.
	Order(OrderEvent),
	/// Events from notification dispatch.
	Notification(NotificationEvent),
}

/// Events related to order lifecycle changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order has been validated and persisted.
	Created { order: Order },
	/// An order moved to a new status.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// An order reached `Delivered` through the signature confirmation
	/// path.
	Confirmed { order_id: String },
	/// An order was removed by an administrator.
	Deleted { order_id: String, owner_id: String },
}

/// Events related to notification dispatch.
///
/// Dispatch failures are events rather than errors: the triggering
/// operation has already committed by the time a notification write can
/// fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationEvent {
	/// A notification record was written for a recipient.
	Dispatched {
		notification_id: String,
		recipient_id: String,
		order_id: String,
	},
	/// A notification write failed; the triggering operation is
	/// unaffected.
	DispatchFailed {
		recipient_id: String,
		order_id: String,
		error: String,
	},
}
