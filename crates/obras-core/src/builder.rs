//! Builder pattern for constructing the obras engine.
//!
//! Composes an [`ObrasEngine`](crate::engine::ObrasEngine) from pluggable
//! backend implementations using factory functions, mirroring how the
//! configuration names one primary implementation per concern.

use crate::confirmation::DeliveryConfirmationService;
use crate::engine::ObrasEngine;
use crate::event_bus::EventBus;
use crate::lifecycle::OrderLifecycle;
use crate::state::OrderStateMachine;
use obras_config::Config;
use obras_export::TextRenderer;
use obras_geocode::{GeocodeError, GeocoderInterface, GeocodingService};
use obras_notify::{NotificationDispatcher, StaticDirectory};
use obras_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for all factory functions needed to build an ObrasEngine.
///
/// Each factory map is keyed by the implementation name used in the
/// configuration file.
pub struct ObrasFactories<SF, GF> {
	pub storage_factories: HashMap<String, SF>,
	pub geocoder_factories: HashMap<String, GF>,
}

/// Builder for constructing an ObrasEngine with pluggable implementations.
pub struct ObrasBuilder {
	config: Config,
}

impl ObrasBuilder {
	/// Creates a new ObrasBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the ObrasEngine using factories for each component type.
	pub fn build<SF, GF>(self, factories: ObrasFactories<SF, GF>) -> Result<ObrasEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		GF: Fn(&toml::Value) -> Result<Box<dyn GeocoderInterface>, GeocodeError>,
	{
		// Storage backend
		let primary_storage = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(primary_storage)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration section",
					primary_storage
				))
			})?;
		let storage_factory = factories
			.storage_factories
			.get(primary_storage)
			.ok_or_else(|| BuilderError::MissingComponent(format!("storage '{}'", primary_storage)))?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary_storage, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %primary_storage, "Loaded");
		let storage = Arc::new(StorageService::new(storage_backend));

		// Geocoding provider
		let primary_geocoder = &self.config.geocoding.primary;
		let geocoder_config = self
			.config
			.geocoding
			.implementations
			.get(primary_geocoder)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary geocoder '{}' has no configuration section",
					primary_geocoder
				))
			})?;
		let geocoder_factory = factories
			.geocoder_factories
			.get(primary_geocoder)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!("geocoder '{}'", primary_geocoder))
			})?;
		let geocoder = geocoder_factory(geocoder_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create geocoder implementation '{}': {}",
				primary_geocoder, e
			))
		})?;
		tracing::info!(component = "geocoding", implementation = %primary_geocoder, "Loaded");
		let geocoding = Arc::new(GeocodingService::new(geocoder));

		// Assemble the core
		let event_bus = EventBus::default();
		let catalog = self.config.catalog.to_catalog();
		let dispatcher = Arc::new(NotificationDispatcher::new(
			storage.clone(),
			Box::new(StaticDirectory::new(
				self.config.notifications.staff_recipients.clone(),
			)),
		));
		let state_machine = Arc::new(OrderStateMachine::new(storage.clone()));
		let lifecycle = Arc::new(OrderLifecycle::new(
			state_machine.clone(),
			dispatcher.clone(),
			catalog,
			event_bus.clone(),
		));
		let confirmation = Arc::new(DeliveryConfirmationService::new(
			state_machine.clone(),
			lifecycle.clone(),
			Box::new(TextRenderer),
			event_bus.clone(),
		));

		Ok(ObrasEngine::new(
			self.config,
			storage,
			geocoding,
			dispatcher,
			state_machine,
			lifecycle,
			confirmation,
			event_bus,
		))
	}
}
