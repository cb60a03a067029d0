//! Geographic types for delivery locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic point in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lng: f64,
}

impl fmt::Display for GeoPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:.6},{:.6}", self.lat, self.lng)
	}
}

/// Structured address returned by reverse geocoding.
///
/// Components the provider could not determine are empty strings, so a
/// caller can still prefill whatever is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAddress {
	pub street: String,
	pub number: String,
	pub colony: String,
	pub municipality: String,
	pub state: String,
	pub postal_code: String,
}
