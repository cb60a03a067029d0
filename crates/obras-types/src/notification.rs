//! Notification records for customers and staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single notification delivered to one recipient.
///
/// Notifications are created by the system only, exactly once per
/// triggering event, and are mutated solely to flip `read` from false to
/// true when the recipient views their list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
	/// Unique identifier for this notification.
	pub id: String,
	/// Id of the user this notification is addressed to.
	pub recipient_id: String,
	/// Id of the order that triggered it.
	pub order_id: String,
	/// Human-readable message shown in the recipient's feed.
	pub message: String,
	pub read: bool,
	pub created_at: DateTime<Utc>,
}
