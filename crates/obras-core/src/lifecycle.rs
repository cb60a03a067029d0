//! Order lifecycle orchestration.
//!
//! Validates and creates orders, advances them through the status state
//! machine, and triggers the notification side effects of every
//! successful operation. The order write is authoritative: notification
//! dispatch failures are logged and published as events but never roll
//! back or fail the operation that triggered them.

use crate::event_bus::EventBus;
use crate::priority;
use crate::state::{OrderStateError, OrderStateMachine};
use chrono::Utc;
use obras_notify::NotificationDispatcher;
use obras_types::{
	Catalog, NotificationEvent, ObrasEvent, Order, OrderDraft, OrderEvent, OrderStatus,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
	/// Malformed draft input; rejected before any state change.
	#[error("Validation failed: {0}")]
	Validation(String),
	/// Attempted status change not present in the transition table.
	#[error("Illegal transition from {from} to {to}")]
	IllegalTransition { from: OrderStatus, to: OrderStatus },
	/// The referenced order does not exist.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// Failure in the storage layer.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<OrderStateError> for LifecycleError {
	fn from(err: OrderStateError) -> Self {
		match err {
			OrderStateError::InvalidTransition { from, to } => {
				LifecycleError::IllegalTransition { from, to }
			}
			OrderStateError::OrderNotFound(id) => LifecycleError::NotFound(id),
			OrderStateError::AlreadyConfirmed(id) => {
				// The lifecycle never writes confirmations itself; treat a
				// leaked confirmation conflict as a storage-level anomaly.
				LifecycleError::Storage(format!("order {} already confirmed", id))
			}
			OrderStateError::Storage(message) => LifecycleError::Storage(message),
		}
	}
}

/// Outcome of an administrative delete.
///
/// Deleting a missing order is a no-op, observably distinct from a
/// successful delete.
#[derive(Debug)]
pub enum DeleteOutcome {
	/// The order existed and was removed.
	Deleted(Order),
	/// No order with that id existed.
	NotFound,
}

/// Orchestrates order creation, status transitions, and deletion.
pub struct OrderLifecycle {
	state_machine: Arc<OrderStateMachine>,
	dispatcher: Arc<NotificationDispatcher>,
	catalog: Catalog,
	event_bus: EventBus,
}

impl OrderLifecycle {
	pub fn new(
		state_machine: Arc<OrderStateMachine>,
		dispatcher: Arc<NotificationDispatcher>,
		catalog: Catalog,
		event_bus: EventBus,
	) -> Self {
		Self {
			state_machine,
			dispatcher,
			catalog,
			event_bus,
		}
	}

	fn validate_draft(&self, draft: &OrderDraft) -> Result<(), LifecycleError> {
		if draft.requester_name.trim().is_empty() {
			return Err(LifecycleError::Validation("Requester name is required".into()));
		}
		if draft.project_name.trim().is_empty() {
			return Err(LifecycleError::Validation("Project name is required".into()));
		}
		if draft.phone.len() < 10 || !draft.phone.chars().all(|c| c.is_ascii_digit()) {
			return Err(LifecycleError::Validation(
				"Phone must be at least 10 digits".into(),
			));
		}
		if draft.items.is_empty() {
			return Err(LifecycleError::Validation(
				"Order must contain at least one material".into(),
			));
		}
		for item in &draft.items {
			if item.quantity == 0 {
				return Err(LifecycleError::Validation(format!(
					"Quantity for {} must be at least 1",
					item.material
				)));
			}
		}
		Ok(())
	}

	/// Validates a draft and creates the order in `Pending` state.
	///
	/// The total is recomputed from the catalog and the priority derived
	/// from the delivery window; neither is ever taken from the client.
	/// Staff are notified best-effort once the order is persisted.
	pub async fn create_order(&self, draft: OrderDraft) -> Result<Order, LifecycleError> {
		self.validate_draft(&draft)?;

		let now = Utc::now();
		let total = self
			.catalog
			.total_for(&draft.items)
			.map_err(|e| LifecycleError::Validation(e.to_string()))?;
		let priority = priority::classify_window(&draft.window, now)
			.map_err(|e| LifecycleError::Validation(e.to_string()))?;

		let order = Order {
			id: Uuid::new_v4().to_string(),
			user_id: draft.user_id,
			requester_name: draft.requester_name,
			project_name: draft.project_name,
			phone: draft.phone,
			address: draft.address,
			location: draft.location,
			items: draft.items,
			total,
			window: draft.window,
			priority,
			status: OrderStatus::Pending,
			confirmation: None,
			created_at: now,
			updated_at: now,
		};

		self.state_machine.store_order(&order).await?;
		tracing::info!(order_id = %order.id, %priority, "Created order");

		self.event_bus.publish(ObrasEvent::Order(OrderEvent::Created {
			order: order.clone(),
		}));

		// Fan-out is best-effort: the order is already the artifact of
		// record.
		match self.dispatcher.notify_creation(&order).await {
			Ok(report) => self.publish_dispatch_report(&order.id, report),
			Err(e) => {
				tracing::warn!(order_id = %order.id, error = %e, "Creation fan-out failed");
			}
		}

		Ok(order)
	}

	/// Advances an order to a new status.
	///
	/// On success the owner receives exactly one notification naming the
	/// new status; an illegal transition leaves the order untouched and
	/// creates no notification.
	pub async fn transition(
		&self,
		order_id: &str,
		new_status: OrderStatus,
	) -> Result<Order, LifecycleError> {
		let (previous, order) = self
			.state_machine
			.transition_order_status(order_id, new_status)
			.await?;

		tracing::info!(order_id = %order.id, from = %previous, to = %new_status, "Order transitioned");
		self.event_bus
			.publish(ObrasEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id.clone(),
				from: previous,
				to: new_status,
			}));

		self.notify_owner(&order, new_status).await;

		Ok(order)
	}

	/// Administrative delete: removes the order and notifies its owner.
	///
	/// Deleting a missing id is a logged no-op.
	pub async fn delete_order(&self, order_id: &str) -> Result<DeleteOutcome, LifecycleError> {
		let Some(order) = self.state_machine.delete_order(order_id).await? else {
			tracing::warn!(order_id = %order_id, "Delete requested for missing order");
			return Ok(DeleteOutcome::NotFound);
		};

		tracing::info!(order_id = %order.id, "Deleted order");
		self.event_bus.publish(ObrasEvent::Order(OrderEvent::Deleted {
			order_id: order.id.clone(),
			owner_id: order.user_id.clone(),
		}));

		if let Err(e) = self.dispatcher.notify_deleted(&order).await {
			tracing::warn!(order_id = %order.id, error = %e, "Failed to notify owner of deletion");
			self.event_bus
				.publish(ObrasEvent::Notification(NotificationEvent::DispatchFailed {
					recipient_id: order.user_id.clone(),
					order_id: order.id.clone(),
					error: e.to_string(),
				}));
		}

		Ok(DeleteOutcome::Deleted(order))
	}

	/// One order by id.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, LifecycleError> {
		Ok(self.state_machine.get_order(order_id).await?)
	}

	/// All orders of one owner, most recent first.
	pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, LifecycleError> {
		let mut orders = self.all_orders().await?;
		orders.retain(|o| o.user_id == user_id);
		Ok(orders)
	}

	/// Every order in the store, most recent first (the staff view).
	pub async fn all_orders(&self) -> Result<Vec<Order>, LifecycleError> {
		let mut orders: Vec<Order> = self
			.state_machine
			.storage()
			.retrieve_all(obras_types::StorageNamespace::Orders.as_str())
			.await
			.map_err(|e| LifecycleError::Storage(e.to_string()))?;
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders)
	}

	/// Dispatches the single owner notification for a status change.
	///
	/// Failures surface as warnings and dispatch events only; the status
	/// write has already committed.
	pub(crate) async fn notify_owner(&self, order: &Order, new_status: OrderStatus) {
		match self.dispatcher.notify_status_change(order, new_status).await {
			Ok(notification) => {
				self.event_bus
					.publish(ObrasEvent::Notification(NotificationEvent::Dispatched {
						notification_id: notification.id,
						recipient_id: notification.recipient_id,
						order_id: notification.order_id,
					}));
			}
			Err(e) => {
				tracing::warn!(
					order_id = %order.id,
					status = %new_status,
					error = %e,
					"Failed to notify owner of status change"
				);
				self.event_bus
					.publish(ObrasEvent::Notification(NotificationEvent::DispatchFailed {
						recipient_id: order.user_id.clone(),
						order_id: order.id.clone(),
						error: e.to_string(),
					}));
			}
		}
	}

	fn publish_dispatch_report(&self, order_id: &str, report: obras_notify::DispatchReport) {
		for notification in report.delivered {
			self.event_bus
				.publish(ObrasEvent::Notification(NotificationEvent::Dispatched {
					notification_id: notification.id,
					recipient_id: notification.recipient_id,
					order_id: notification.order_id,
				}));
		}
		for (recipient_id, error) in report.failed {
			self.event_bus
				.publish(ObrasEvent::Notification(NotificationEvent::DispatchFailed {
					recipient_id,
					order_id: order_id.to_string(),
					error,
				}));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{draft, stack};
	use obras_types::Priority;
	use rust_decimal::Decimal;

	#[tokio::test]
	async fn create_order_recomputes_total_and_derives_priority() {
		let stack = stack(&["admin-1", "admin-2"]);

		// from = now + 1 day: within the 3-day urgent horizon
		let order = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();

		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.priority, Priority::Urgent);
		// 10 bultos of cemento at 250.00
		assert_eq!(order.total, Decimal::from(2500));
		assert!(order.confirmation.is_none());

		// One creation notification per staff recipient, none for the owner
		for staff in ["admin-1", "admin-2"] {
			let list = stack.dispatcher.notifications_for(staff).await.unwrap();
			assert_eq!(list.len(), 1);
		}
		let owner = stack
			.dispatcher
			.notifications_for("customer-1")
			.await
			.unwrap();
		assert!(owner.is_empty());
	}

	#[tokio::test]
	async fn create_order_ignores_client_supplied_totals() {
		// The draft carries no total at all; the stored one must come from
		// the catalog regardless of what any client claims.
		let stack = stack(&["admin-1"]);
		let mut draft = draft("customer-1", 10, 12);
		draft.items = vec![
			obras_types::LineItem {
				material: "cemento".into(),
				quantity: 2,
			},
			obras_types::LineItem {
				material: "alambre".into(),
				quantity: 3,
			},
		];

		let order = stack.lifecycle.create_order(draft).await.unwrap();
		assert_eq!(order.total, "545.00".parse::<Decimal>().unwrap());
		assert_eq!(order.priority, Priority::Normal);
	}

	#[tokio::test]
	async fn invalid_drafts_are_rejected_before_any_write() {
		let stack = stack(&["admin-1"]);

		let mut zero_quantity = draft("customer-1", 1, 2);
		zero_quantity.items[0].quantity = 0;
		assert!(matches!(
			stack.lifecycle.create_order(zero_quantity).await,
			Err(LifecycleError::Validation(_))
		));

		let mut no_items = draft("customer-1", 1, 2);
		no_items.items.clear();
		assert!(matches!(
			stack.lifecycle.create_order(no_items).await,
			Err(LifecycleError::Validation(_))
		));

		let mut unknown_material = draft("customer-1", 1, 2);
		unknown_material.items[0].material = "grava".into();
		assert!(matches!(
			stack.lifecycle.create_order(unknown_material).await,
			Err(LifecycleError::Validation(_))
		));

		let inverted_window = draft("customer-1", 4, 1);
		assert!(matches!(
			stack.lifecycle.create_order(inverted_window).await,
			Err(LifecycleError::Validation(_))
		));

		let mut bad_phone = draft("customer-1", 1, 2);
		bad_phone.phone = "55-1234".into();
		assert!(matches!(
			stack.lifecycle.create_order(bad_phone).await,
			Err(LifecycleError::Validation(_))
		));

		// Nothing was written and nobody was notified
		assert!(stack.lifecycle.all_orders().await.unwrap().is_empty());
		let staff = stack.dispatcher.notifications_for("admin-1").await.unwrap();
		assert!(staff.is_empty());
	}

	#[tokio::test]
	async fn transition_notifies_owner_exactly_once() {
		let stack = stack(&["admin-1"]);
		let order = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();

		let updated = stack
			.lifecycle
			.transition(&order.id, OrderStatus::Processing)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Processing);

		let owner = stack
			.dispatcher
			.notifications_for("customer-1")
			.await
			.unwrap();
		assert_eq!(owner.len(), 1);
		assert!(owner[0].message.contains("Processing"));
	}

	#[tokio::test]
	async fn illegal_transition_changes_nothing_and_notifies_nobody() {
		let stack = stack(&["admin-1"]);
		let order = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();

		stack
			.lifecycle
			.transition(&order.id, OrderStatus::Cancelled)
			.await
			.unwrap();

		// Cancelled is terminal
		let result = stack
			.lifecycle
			.transition(&order.id, OrderStatus::Processing)
			.await;
		assert!(matches!(
			result,
			Err(LifecycleError::IllegalTransition {
				from: OrderStatus::Cancelled,
				to: OrderStatus::Processing,
			})
		));

		let current = stack.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(current.status, OrderStatus::Cancelled);

		// Only the cancellation notification exists
		let owner = stack
			.dispatcher
			.notifications_for("customer-1")
			.await
			.unwrap();
		assert_eq!(owner.len(), 1);
	}

	#[tokio::test]
	async fn delete_notifies_owner_and_missing_delete_is_a_noop() {
		let stack = stack(&["admin-1"]);
		let order = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();

		let outcome = stack.lifecycle.delete_order(&order.id).await.unwrap();
		assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
		assert!(matches!(
			stack.lifecycle.get_order(&order.id).await,
			Err(LifecycleError::NotFound(_))
		));

		let owner = stack
			.dispatcher
			.notifications_for("customer-1")
			.await
			.unwrap();
		assert_eq!(owner.len(), 1);
		assert!(owner[0].message.contains("removed"));

		// Deleting again is observably a no-op, not an error
		let outcome = stack.lifecycle.delete_order(&order.id).await.unwrap();
		assert!(matches!(outcome, DeleteOutcome::NotFound));
	}

	#[tokio::test]
	async fn owner_views_are_filtered_and_most_recent_first() {
		let stack = stack(&["admin-1"]);
		let first = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();
		let second = stack
			.lifecycle
			.create_order(draft("customer-1", 5, 6))
			.await
			.unwrap();
		stack
			.lifecycle
			.create_order(draft("customer-2", 1, 4))
			.await
			.unwrap();

		let mine = stack.lifecycle.orders_for_user("customer-1").await.unwrap();
		assert_eq!(mine.len(), 2);
		assert_eq!(mine[0].id, second.id);
		assert_eq!(mine[1].id, first.id);

		let all = stack.lifecycle.all_orders().await.unwrap();
		assert_eq!(all.len(), 3);
	}

	#[tokio::test]
	async fn full_lifecycle_scenario() {
		let stack = stack(&["admin-1", "admin-2"]);

		// Window starts tomorrow: Urgent
		let order = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();
		assert_eq!(order.priority, Priority::Urgent);

		stack
			.lifecycle
			.transition(&order.id, OrderStatus::Processing)
			.await
			.unwrap();
		stack
			.lifecycle
			.transition(&order.id, OrderStatus::Shipped)
			.await
			.unwrap();
		let delivered = stack
			.confirmation
			.confirm(&order.id, "sig:firma", chrono::Utc::now())
			.await
			.unwrap();
		assert_eq!(delivered.status, OrderStatus::Delivered);
		assert!(delivered.confirmation.is_some());

		// Exactly one owner notification per transition
		let owner = stack
			.dispatcher
			.notifications_for("customer-1")
			.await
			.unwrap();
		assert_eq!(owner.len(), 3);

		// Staff heard about the creation only
		for staff in ["admin-1", "admin-2"] {
			let list = stack.dispatcher.notifications_for(staff).await.unwrap();
			assert_eq!(list.len(), 1);
		}
	}

	#[tokio::test]
	async fn events_are_published_for_observers() {
		let stack = stack(&["admin-1"]);
		let mut events = stack.event_bus.subscribe();

		let order = stack
			.lifecycle
			.create_order(draft("customer-1", 1, 4))
			.await
			.unwrap();

		match events.recv().await.unwrap() {
			ObrasEvent::Order(OrderEvent::Created { order: created }) => {
				assert_eq!(created.id, order.id);
			}
			other => panic!("expected creation event, got {:?}", other),
		}
	}
}
