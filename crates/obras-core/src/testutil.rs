//! Shared fixtures for core tests.

use crate::confirmation::DeliveryConfirmationService;
use crate::event_bus::EventBus;
use crate::lifecycle::OrderLifecycle;
use crate::state::OrderStateMachine;
use chrono::{Duration, Utc};
use obras_export::TextRenderer;
use obras_notify::{NotificationDispatcher, StaticDirectory};
use obras_storage::implementations::memory::MemoryStorage;
use obras_storage::StorageService;
use obras_types::{Catalog, CatalogEntry, DeliveryAddress, DeliveryWindow, LineItem, OrderDraft};
use std::sync::Arc;

pub(crate) struct TestStack {
	pub dispatcher: Arc<NotificationDispatcher>,
	pub lifecycle: Arc<OrderLifecycle>,
	pub confirmation: Arc<DeliveryConfirmationService>,
	pub event_bus: EventBus,
}

pub(crate) fn catalog() -> Catalog {
	Catalog::new(vec![
		CatalogEntry {
			name: "cemento".into(),
			unit_price: "250.00".parse().unwrap(),
			unit: "bulto".into(),
		},
		CatalogEntry {
			name: "mortero".into(),
			unit_price: "220.00".parse().unwrap(),
			unit: "bulto".into(),
		},
		CatalogEntry {
			name: "alambre".into(),
			unit_price: "15.00".parse().unwrap(),
			unit: "kg".into(),
		},
	])
}

pub(crate) fn stack(staff: &[&str]) -> TestStack {
	let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
	let event_bus = EventBus::default();
	let dispatcher = Arc::new(NotificationDispatcher::new(
		storage.clone(),
		Box::new(StaticDirectory::new(
			staff.iter().map(|s| s.to_string()).collect(),
		)),
	));
	let state_machine = Arc::new(OrderStateMachine::new(storage.clone()));
	let lifecycle = Arc::new(OrderLifecycle::new(
		state_machine.clone(),
		dispatcher.clone(),
		catalog(),
		event_bus.clone(),
	));
	let confirmation = Arc::new(DeliveryConfirmationService::new(
		state_machine,
		lifecycle.clone(),
		Box::new(TextRenderer),
		event_bus.clone(),
	));

	TestStack {
		dispatcher,
		lifecycle,
		confirmation,
		event_bus,
	}
}

pub(crate) fn draft(user_id: &str, from_days: i64, to_days: i64) -> OrderDraft {
	let now = Utc::now();
	OrderDraft {
		user_id: user_id.into(),
		requester_name: "Juan Pérez".into(),
		project_name: "Torre Reforma".into(),
		phone: "5512345678".into(),
		address: DeliveryAddress {
			street: "Av. Siempre Viva".into(),
			number: "742".into(),
			colony: "Centro".into(),
			municipality: "Cuauhtémoc".into(),
			state: "Ciudad de México".into(),
			postal_code: "06000".into(),
		},
		location: None,
		items: vec![LineItem {
			material: "cemento".into(),
			quantity: 10,
		}],
		window: DeliveryWindow {
			from: now + Duration::days(from_days),
			to: now + Duration::days(to_days),
		},
	}
}
