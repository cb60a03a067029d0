//! Order types for the obras system.
//!
//! This module defines the central order entity along with the drafts it is
//! created from, its delivery window and address, its urgency tier, and the
//! write-once delivery confirmation record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GeoPoint;

/// A material line in an order.
///
/// The material name must resolve against the catalog; the unit price is
/// looked up there and never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	/// Catalog name of the material (e.g. "cemento").
	pub material: String,
	/// Ordered quantity in the material's unit of measure. Must be > 0.
	pub quantity: u32,
}

/// The delivery window requested by the customer.
///
/// Both bounds are inclusive calendar instants; `from` must not be after
/// `to`, and neither may precede the submission day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
	pub from: DateTime<Utc>,
	pub to: DateTime<Utc>,
}

/// Free-text delivery address as supplied by the customer.
///
/// These fields are what the user typed; the trusted delivery location is
/// the confirmed [`GeoPoint`] on the order, never this text alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
	pub street: String,
	/// Exterior number.
	pub number: String,
	/// Neighborhood (colonia).
	pub colony: String,
	pub municipality: String,
	pub state: String,
	pub postal_code: String,
}

impl DeliveryAddress {
	/// Renders the address as a single line suitable for forward geocoding.
	pub fn to_query(&self) -> String {
		format!(
			"{} {}, {}, {}, {}, {}",
			self.street, self.number, self.colony, self.municipality, self.state, self.postal_code
		)
	}
}

/// Urgency tier derived once from the delivery window at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
	/// Delivery starts within 3 days.
	Urgent,
	/// Delivery starts in more than 3 and at most 7 days.
	Soon,
	/// Delivery starts in more than 7 days.
	Normal,
}

impl fmt::Display for Priority {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Priority::Urgent => write!(f, "Urgent"),
			Priority::Soon => write!(f, "Soon"),
			Priority::Normal => write!(f, "Normal"),
		}
	}
}

/// Status of an order in its fulfillment lifecycle.
///
/// Transitions between statuses are validated centrally by the order state
/// machine; `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
	/// Order has been received and awaits processing.
	Pending,
	/// Staff are assembling the order.
	Processing,
	/// The order has left the yard.
	Shipped,
	/// The order was received by the customer.
	Delivered,
	/// The order was cancelled before delivery.
	Cancelled,
}

impl OrderStatus {
	/// True for statuses with no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Pending => write!(f, "Pending"),
			OrderStatus::Processing => write!(f, "Processing"),
			OrderStatus::Shipped => write!(f, "Shipped"),
			OrderStatus::Delivered => write!(f, "Delivered"),
			OrderStatus::Cancelled => write!(f, "Cancelled"),
		}
	}
}

/// Proof of receipt bound to a delivered order.
///
/// Written at most once; a second confirmation attempt must be rejected
/// rather than overwrite this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfirmation {
	/// Reference to the captured signature artifact (data URL or blob key).
	pub signature: String,
	/// Instant the recipient signed.
	pub confirmed_at: DateTime<Utc>,
}

/// Client-submitted order draft, before validation.
///
/// A draft carries everything the customer typed plus an optionally
/// confirmed delivery point. The lifecycle validates it, recomputes the
/// total against the catalog, and derives the priority before an [`Order`]
/// ever exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
	/// Id of the user submitting the order.
	pub user_id: String,
	pub requester_name: String,
	/// Construction site ("obra") this order is for.
	pub project_name: String,
	pub phone: String,
	pub address: DeliveryAddress,
	/// Delivery point, present only when the resolve→confirm protocol
	/// completed. Never populated from geocoding alone.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<GeoPoint>,
	pub items: Vec<LineItem>,
	pub window: DeliveryWindow,
}

/// A validated customer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Id of the owning user.
	pub user_id: String,
	pub requester_name: String,
	pub project_name: String,
	pub phone: String,
	pub address: DeliveryAddress,
	/// Confirmed delivery point, if the customer completed the map
	/// confirmation step.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<GeoPoint>,
	pub items: Vec<LineItem>,
	/// Total recomputed from the catalog; never taken from the client.
	pub total: Decimal,
	pub window: DeliveryWindow,
	/// Urgency tier, derived once at creation and immutable thereafter.
	pub priority: Priority,
	pub status: OrderStatus,
	/// Write-once proof of receipt, present only on the confirmed
	/// delivery path.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmation: Option<DeliveryConfirmation>,
	/// Server-assigned creation instant, used for most-recent-first views.
	pub created_at: DateTime<Utc>,
	/// Refreshed on every persisted mutation.
	pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn terminal_statuses() {
		assert!(OrderStatus::Delivered.is_terminal());
		assert!(OrderStatus::Cancelled.is_terminal());
		assert!(!OrderStatus::Pending.is_terminal());
		assert!(!OrderStatus::Processing.is_terminal());
		assert!(!OrderStatus::Shipped.is_terminal());
	}

	#[test]
	fn address_query_includes_all_components() {
		let address = DeliveryAddress {
			street: "Av. Siempre Viva".into(),
			number: "742".into(),
			colony: "Centro".into(),
			municipality: "Cuauhtémoc".into(),
			state: "Ciudad de México".into(),
			postal_code: "06000".into(),
		};
		let query = address.to_query();
		assert!(query.contains("Av. Siempre Viva 742"));
		assert!(query.contains("Cuauhtémoc"));
		assert!(query.contains("06000"));
	}
}
