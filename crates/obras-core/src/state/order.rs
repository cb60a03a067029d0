//! Order state machine implementation.
//!
//! Manages order status transitions with validation. The happy path is
//! Pending -> Processing -> Shipped -> Delivered, with Cancelled reachable
//! from any non-terminal state. Skipping forward (e.g. Pending ->
//! Delivered) is deliberately legal so staff can correct an under-reported
//! status; transitions outside the table are rejected and leave the order
//! untouched.

use chrono::Utc;
use obras_storage::StorageService;
use obras_types::{DeliveryConfirmation, Order, OrderStatus, StorageNamespace};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Order {0} already has a delivery confirmation")]
	AlreadyConfirmed(String),
}

// Static transition table - each state maps to its allowed next states
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([
			OrderStatus::Processing,
			OrderStatus::Shipped,
			OrderStatus::Delivered,
			OrderStatus::Cancelled,
		]),
	);
	m.insert(
		OrderStatus::Processing,
		HashSet::from([
			OrderStatus::Shipped,
			OrderStatus::Delivered,
			OrderStatus::Cancelled,
		]),
	);
	m.insert(
		OrderStatus::Shipped,
		HashSet::from([OrderStatus::Delivered, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Delivered, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Manages order state transitions and persistence
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Returns a reference to the underlying storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Checks if a state transition is valid
	pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		self.storage
			.retrieve(StorageNamespace::Orders.as_str(), order_id)
			.await
			.map_err(|e| match e {
				obras_storage::StorageError::NotFound => {
					OrderStateError::OrderNotFound(order_id.to_string())
				}
				other => OrderStateError::Storage(other.to_string()),
			})
	}

	/// Stores a new order
	pub async fn store_order(&self, order: &Order) -> Result<(), OrderStateError> {
		self.storage
			.store(StorageNamespace::Orders.as_str(), &order.id, order)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))
	}

	/// Updates an order with a closure and persists it
	pub async fn update_order_with<F>(
		&self,
		order_id: &str,
		updater: F,
	) -> Result<Order, OrderStateError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = self.get_order(order_id).await?;

		// Apply the update
		updater(&mut order);

		// Automatically refresh the updated_at timestamp
		order.updated_at = Utc::now();

		self.storage
			.update(StorageNamespace::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;

		Ok(order)
	}

	/// Transitions an order to a new status with validation.
	///
	/// Returns the previous status alongside the updated order so callers
	/// can report the transition.
	pub async fn transition_order_status(
		&self,
		order_id: &str,
		new_status: OrderStatus,
	) -> Result<(OrderStatus, Order), OrderStateError> {
		let order = self.get_order(order_id).await?;
		let previous = order.status;

		if !Self::is_valid_transition(previous, new_status) {
			return Err(OrderStateError::InvalidTransition {
				from: previous,
				to: new_status,
			});
		}

		let updated = self
			.update_order_with(order_id, |o| {
				o.status = new_status;
			})
			.await?;

		Ok((previous, updated))
	}

	/// Transitions an order to `Delivered` and attaches its confirmation
	/// in the same persisted update.
	///
	/// Rejects orders that already carry a confirmation; the existing
	/// record is never overwritten.
	pub async fn deliver_with_confirmation(
		&self,
		order_id: &str,
		confirmation: DeliveryConfirmation,
	) -> Result<(OrderStatus, Order), OrderStateError> {
		let order = self.get_order(order_id).await?;
		let previous = order.status;

		if order.confirmation.is_some() {
			return Err(OrderStateError::AlreadyConfirmed(order_id.to_string()));
		}
		if !Self::is_valid_transition(previous, OrderStatus::Delivered) {
			return Err(OrderStateError::InvalidTransition {
				from: previous,
				to: OrderStatus::Delivered,
			});
		}

		// Status and confirmation land in one storage write.
		let updated = self
			.update_order_with(order_id, |o| {
				o.status = OrderStatus::Delivered;
				o.confirmation = Some(confirmation);
			})
			.await?;

		Ok((previous, updated))
	}

	/// Removes an order, returning it if it existed.
	///
	/// Deleting a missing order is not an error; the caller decides how
	/// to report the anomaly.
	pub async fn delete_order(&self, order_id: &str) -> Result<Option<Order>, OrderStateError> {
		let order = match self.get_order(order_id).await {
			Ok(order) => order,
			Err(OrderStateError::OrderNotFound(_)) => return Ok(None),
			Err(e) => return Err(e),
		};

		self.storage
			.remove(StorageNamespace::Orders.as_str(), order_id)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;

		Ok(Some(order))
	}
}
