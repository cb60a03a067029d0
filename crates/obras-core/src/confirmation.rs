//! Delivery confirmation service.
//!
//! The only path by which an order reaches `Delivered` with proof of
//! receipt: a signature artifact is captured, timestamped, and bound
//! immutably to the order in the same persisted update as the status
//! change. The human-readable delivery document is rendered from the
//! stored order and can be regenerated any number of times without
//! touching the confirmation.

use crate::event_bus::EventBus;
use crate::lifecycle::OrderLifecycle;
use crate::state::{OrderStateError, OrderStateMachine};
use chrono::{DateTime, Utc};
use obras_export::{DeliveryDocument, DocumentExportInterface, ExportArtifact};
use obras_types::{DeliveryConfirmation, ObrasEvent, Order, OrderEvent, OrderStatus};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during delivery confirmation.
#[derive(Debug, Error)]
pub enum ConfirmationError {
	/// The signature artifact is empty.
	#[error("Signature artifact is empty")]
	EmptySignature,
	/// The order already carries a confirmation; it is preserved
	/// untouched.
	#[error("Order {0} already has a delivery confirmation")]
	AlreadyConfirmed(String),
	/// The order cannot legally move to `Delivered` from its current
	/// status.
	#[error("Illegal transition from {from} to Delivered")]
	IllegalTransition { from: OrderStatus },
	/// The referenced order does not exist.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// Failure in the storage layer.
	#[error("Storage error: {0}")]
	Storage(String),
	/// Failure rendering the delivery document.
	#[error("Export error: {0}")]
	Export(String),
}

impl From<OrderStateError> for ConfirmationError {
	fn from(err: OrderStateError) -> Self {
		match err {
			OrderStateError::AlreadyConfirmed(id) => ConfirmationError::AlreadyConfirmed(id),
			OrderStateError::InvalidTransition { from, .. } => {
				ConfirmationError::IllegalTransition { from }
			}
			OrderStateError::OrderNotFound(id) => ConfirmationError::NotFound(id),
			OrderStateError::Storage(message) => ConfirmationError::Storage(message),
		}
	}
}

/// Captures signatures and produces delivery documents.
pub struct DeliveryConfirmationService {
	state_machine: Arc<OrderStateMachine>,
	lifecycle: Arc<OrderLifecycle>,
	exporter: Box<dyn DocumentExportInterface>,
	event_bus: EventBus,
}

impl DeliveryConfirmationService {
	pub fn new(
		state_machine: Arc<OrderStateMachine>,
		lifecycle: Arc<OrderLifecycle>,
		exporter: Box<dyn DocumentExportInterface>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state_machine,
			lifecycle,
			exporter,
			event_bus,
		}
	}

	/// Confirms delivery of an order with a captured signature.
	///
	/// Status change and confirmation attach in one persisted update; the
	/// owner is then notified of the `Delivered` status like any other
	/// transition. A second confirmation attempt fails with
	/// `AlreadyConfirmed` and leaves the stored record unchanged.
	pub async fn confirm(
		&self,
		order_id: &str,
		signature: &str,
		confirmed_at: DateTime<Utc>,
	) -> Result<Order, ConfirmationError> {
		if signature.trim().is_empty() {
			return Err(ConfirmationError::EmptySignature);
		}

		let confirmation = DeliveryConfirmation {
			signature: signature.to_string(),
			confirmed_at,
		};

		let (previous, order) = self
			.state_machine
			.deliver_with_confirmation(order_id, confirmation)
			.await?;

		tracing::info!(order_id = %order.id, from = %previous, "Delivery confirmed");
		self.event_bus
			.publish(ObrasEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id.clone(),
				from: previous,
				to: OrderStatus::Delivered,
			}));
		self.event_bus
			.publish(ObrasEvent::Order(OrderEvent::Confirmed {
				order_id: order.id.clone(),
			}));

		self.lifecycle
			.notify_owner(&order, OrderStatus::Delivered)
			.await;

		Ok(order)
	}

	/// Renders the delivery document for a confirmed order.
	///
	/// Reads the stored order and renders it; calling this repeatedly
	/// never mutates the confirmation.
	pub async fn export_document(&self, order_id: &str) -> Result<ExportArtifact, ConfirmationError> {
		let order = self.state_machine.get_order(order_id).await?;
		let document =
			DeliveryDocument::from_order(&order).map_err(|e| ConfirmationError::Export(e.to_string()))?;
		self.exporter
			.render(&document)
			.await
			.map_err(|e| ConfirmationError::Export(e.to_string()))
	}
}
