//! Engine handle over the assembled system.
//!
//! Holds the wired services and exposes them to the presentation layer.
//! The run loop only observes: it logs lifecycle events from the bus
//! until shutdown, since all mutations happen through the service
//! handles.

use crate::confirmation::DeliveryConfirmationService;
use crate::event_bus::EventBus;
use crate::lifecycle::OrderLifecycle;
use crate::state::OrderStateMachine;
use obras_config::Config;
use obras_geocode::GeocodingService;
use obras_notify::NotificationDispatcher;
use obras_storage::StorageService;
use obras_types::{NotificationEvent, ObrasEvent, OrderEvent};
use std::sync::Arc;

/// The assembled order-management system.
#[derive(Clone)]
pub struct ObrasEngine {
	config: Config,
	storage: Arc<StorageService>,
	geocoding: Arc<GeocodingService>,
	dispatcher: Arc<NotificationDispatcher>,
	state_machine: Arc<OrderStateMachine>,
	lifecycle: Arc<OrderLifecycle>,
	confirmation: Arc<DeliveryConfirmationService>,
	event_bus: EventBus,
}

impl ObrasEngine {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		geocoding: Arc<GeocodingService>,
		dispatcher: Arc<NotificationDispatcher>,
		state_machine: Arc<OrderStateMachine>,
		lifecycle: Arc<OrderLifecycle>,
		confirmation: Arc<DeliveryConfirmationService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			config,
			storage,
			geocoding,
			dispatcher,
			state_machine,
			lifecycle,
			confirmation,
			event_bus,
		}
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the geocoding service.
	pub fn geocoding(&self) -> &Arc<GeocodingService> {
		&self.geocoding
	}

	/// Returns a reference to the notification dispatcher.
	pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
		&self.dispatcher
	}

	/// Returns a reference to the order state machine.
	pub fn state_machine(&self) -> &Arc<OrderStateMachine> {
		&self.state_machine
	}

	/// Returns a reference to the order lifecycle.
	pub fn lifecycle(&self) -> &Arc<OrderLifecycle> {
		&self.lifecycle
	}

	/// Returns a reference to the delivery confirmation service.
	pub fn confirmation(&self) -> &Arc<DeliveryConfirmationService> {
		&self.confirmation
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Observes lifecycle events until ctrl-c.
	pub async fn run(&self) {
		let mut events = self.event_bus.subscribe();
		tracing::info!(service = %self.config.service.id, "Engine running");

		loop {
			tokio::select! {
				event = events.recv() => {
					match event {
						Ok(event) => Self::log_event(&event),
						Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
							tracing::warn!(missed, "Event observer lagged");
						}
						Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
					}
				}
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		tracing::info!("Engine stopped");
	}

	fn log_event(event: &ObrasEvent) {
		match event {
			ObrasEvent::Order(OrderEvent::Created { order }) => {
				tracing::info!(order_id = %order.id, priority = %order.priority, "Order created");
			}
			ObrasEvent::Order(OrderEvent::StatusChanged { order_id, from, to }) => {
				tracing::info!(order_id = %order_id, %from, %to, "Order status changed");
			}
			ObrasEvent::Order(OrderEvent::Confirmed { order_id }) => {
				tracing::info!(order_id = %order_id, "Delivery confirmed");
			}
			ObrasEvent::Order(OrderEvent::Deleted { order_id, .. }) => {
				tracing::info!(order_id = %order_id, "Order deleted");
			}
			ObrasEvent::Notification(NotificationEvent::Dispatched {
				recipient_id,
				order_id,
				..
			}) => {
				tracing::debug!(recipient_id = %recipient_id, order_id = %order_id, "Notification dispatched");
			}
			ObrasEvent::Notification(NotificationEvent::DispatchFailed {
				recipient_id,
				order_id,
				error,
			}) => {
				tracing::warn!(recipient_id = %recipient_id, order_id = %order_id, %error, "Notification dispatch failed");
			}
		}
	}
}
