//! Address resolution module for the obras order-management backend.
//!
//! This module wraps a third-party geocoding capability behind two
//! operations: forward (text → coordinates) and reverse (coordinates →
//! structured address). Forward geocoding is inherently ambiguous, so a
//! resolved point is never trusted as final: it enters the two-phase
//! resolve→confirm protocol in [`resolution`] and only an explicitly
//! confirmed point may be committed to an order.

use async_trait::async_trait;
use obras_types::{ConfigSchema, GeoPoint, ImplementationRegistry, StructuredAddress};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod google;
}

pub mod resolution;

pub use resolution::{LocationDraft, ResolutionError};

/// Errors that can occur during geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
	/// The provider found no result for the given input.
	#[error("Address not found")]
	AddressNotFound,
	/// Transport, authentication, or quota failure at the provider.
	#[error("Provider error: {0}")]
	Provider(String),
	/// Configuration validation failure.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for geocoding providers.
///
/// Implementations make exactly one attempt per call; retry policy belongs
/// to the caller, since blind retries of a paid, rate-limited provider are
/// undesirable.
#[async_trait]
pub trait GeocoderInterface: Send + Sync {
	/// Returns the configuration schema for this geocoder implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Resolves a free-text address to a geographic point.
	async fn forward(&self, address: &str) -> Result<GeoPoint, GeocodeError>;

	/// Resolves a geographic point to a structured address.
	///
	/// Components the provider cannot determine come back as empty
	/// strings; only an outright provider failure fails the call.
	async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress, GeocodeError>;
}

/// Type alias for geocoder factory functions.
pub type GeocoderFactory = fn(&toml::Value) -> Result<Box<dyn GeocoderInterface>, GeocodeError>;

/// Registry trait for geocoder implementations.
pub trait GeocoderRegistry: ImplementationRegistry<Factory = GeocoderFactory> {}

/// Get all registered geocoder implementations.
pub fn get_all_implementations() -> Vec<(&'static str, GeocoderFactory)> {
	use implementations::google;

	vec![(google::Registry::NAME, google::Registry::factory())]
}

/// Service wrapping the configured geocoding provider.
///
/// The service adds observability and the entry point into the
/// resolve→confirm protocol; it holds no order state and never mutates an
/// order itself.
pub struct GeocodingService {
	provider: Box<dyn GeocoderInterface>,
}

impl GeocodingService {
	/// Creates a new GeocodingService with the specified provider.
	pub fn new(provider: Box<dyn GeocoderInterface>) -> Self {
		Self { provider }
	}

	/// Forward-geocodes a free-text address.
	pub async fn forward(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
		let point = self.provider.forward(address).await?;
		tracing::debug!(%point, "Forward geocoded address");
		Ok(point)
	}

	/// Reverse-geocodes a point into a structured address for prefilling.
	pub async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress, GeocodeError> {
		self.provider.reverse(point).await
	}

	/// Starts the resolve→confirm protocol for an address.
	///
	/// Returns a [`LocationDraft`] in the `Proposed` state. The caller
	/// shows the point on a map, lets the user drag it, and calls
	/// [`LocationDraft::confirm`] on explicit acknowledgment; only then
	/// does a committable point exist.
	pub async fn resolve(&self, address: &str) -> Result<LocationDraft, GeocodeError> {
		let point = self.forward(address).await?;
		Ok(LocationDraft::proposed(point))
	}
}
