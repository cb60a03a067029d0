//! Google Maps Geocoding API implementation.
//!
//! Normalizes the provider's status-based responses into the crate's error
//! taxonomy: `ZERO_RESULTS` becomes `AddressNotFound`, everything else
//! that is not `OK` (quota, auth, transport) becomes `Provider`. Each call
//! is a single attempt; timeouts surface as provider errors.

use crate::{GeocodeError, GeocoderFactory, GeocoderInterface, GeocoderRegistry};
use async_trait::async_trait;
use obras_types::{
	ConfigSchema, Field, FieldType, GeoPoint, ImplementationRegistry, Schema, StructuredAddress,
	ValidationError,
};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Response payload of the Geocoding API.
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
	status: String,
	#[serde(default)]
	error_message: Option<String>,
	#[serde(default)]
	results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
	geometry: Geometry,
	#[serde(default)]
	address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
	location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
	lat: f64,
	lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
	long_name: String,
	types: Vec<String>,
}

/// Geocoder backed by the Google Maps Geocoding API.
pub struct GoogleGeocoder {
	client: reqwest::Client,
	api_key: String,
	base_url: String,
}

impl GoogleGeocoder {
	pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, GeocodeError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GeocodeError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			api_key,
			base_url,
		})
	}

	async fn request(&self, query: &[(&str, &str)]) -> Result<GeocodeResponse, GeocodeError> {
		let response = self
			.client
			.get(&self.base_url)
			.query(query)
			.query(&[("key", self.api_key.as_str())])
			.send()
			.await
			.map_err(|e| GeocodeError::Provider(e.to_string()))?;

		response
			.json::<GeocodeResponse>()
			.await
			.map_err(|e| GeocodeError::Provider(e.to_string()))
	}
}

/// Extracts the first result of a successful payload, normalizing the
/// provider status into the crate's error taxonomy.
fn first_result(response: GeocodeResponse) -> Result<GeocodeResult, GeocodeError> {
	match response.status.as_str() {
		"OK" => response
			.results
			.into_iter()
			.next()
			.ok_or(GeocodeError::AddressNotFound),
		"ZERO_RESULTS" => Err(GeocodeError::AddressNotFound),
		status => {
			let detail = response.error_message.unwrap_or_default();
			Err(GeocodeError::Provider(format!("{} {}", status, detail)))
		}
	}
}

/// Picks the first address component matching any of the given type tags,
/// or an empty string when the provider omitted it.
fn component(components: &[AddressComponent], types: &[&str]) -> String {
	components
		.iter()
		.find(|c| types.iter().any(|t| c.types.iter().any(|ct| ct == t)))
		.map(|c| c.long_name.clone())
		.unwrap_or_default()
}

fn to_structured_address(result: &GeocodeResult) -> StructuredAddress {
	let components = &result.address_components;
	StructuredAddress {
		street: component(components, &["route"]),
		number: component(components, &["street_number"]),
		colony: component(components, &["neighborhood", "sublocality"]),
		municipality: component(components, &["locality", "administrative_area_level_2"]),
		state: component(components, &["administrative_area_level_1"]),
		postal_code: component(components, &["postal_code"]),
	}
}

#[async_trait]
impl GeocoderInterface for GoogleGeocoder {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(GoogleGeocoderSchema)
	}

	async fn forward(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
		let response = self.request(&[("address", address)]).await?;
		let result = first_result(response)?;
		Ok(GeoPoint {
			lat: result.geometry.location.lat,
			lng: result.geometry.location.lng,
		})
	}

	async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress, GeocodeError> {
		let latlng = format!("{},{}", point.lat, point.lng);
		let response = self.request(&[("latlng", latlng.as_str())]).await?;
		let result = first_result(response)?;
		Ok(to_structured_address(&result))
	}
}

/// Configuration schema for the Google geocoder.
pub struct GoogleGeocoderSchema;

impl ConfigSchema for GoogleGeocoderSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("api_key", FieldType::String)],
			vec![
				Field::new("base_url", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Google geocoder from configuration.
///
/// Configuration parameters:
/// - `api_key`: Geocoding API key (required; usually `${GOOGLE_MAPS_API_KEY}`)
/// - `base_url`: Override for the API endpoint (default: the public endpoint)
/// - `timeout_seconds`: Request timeout (default: 10)
pub fn create_geocoder(config: &toml::Value) -> Result<Box<dyn GeocoderInterface>, GeocodeError> {
	GoogleGeocoderSchema
		.validate(config)
		.map_err(|e| GeocodeError::Configuration(e.to_string()))?;

	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| GeocodeError::Configuration("api_key is required".into()))?
		.to_string();

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_BASE_URL)
		.to_string();

	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| Duration::from_secs(v as u64))
		.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));

	Ok(Box::new(GoogleGeocoder::new(api_key, base_url, timeout)?))
}

/// Registry for the Google geocoder implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "google";
	type Factory = GeocoderFactory;

	fn factory() -> Self::Factory {
		create_geocoder
	}
}

impl GeocoderRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(payload: &str) -> GeocodeResponse {
		serde_json::from_str(payload).unwrap()
	}

	#[test]
	fn ok_payload_yields_first_result() {
		let response = parse(
			r#"{
				"status": "OK",
				"results": [
					{
						"geometry": { "location": { "lat": 19.4326, "lng": -99.1332 } },
						"address_components": []
					},
					{
						"geometry": { "location": { "lat": 0.0, "lng": 0.0 } },
						"address_components": []
					}
				]
			}"#,
		);
		let result = first_result(response).unwrap();
		assert_eq!(result.geometry.location.lat, 19.4326);
	}

	#[test]
	fn zero_results_maps_to_address_not_found() {
		let response = parse(r#"{ "status": "ZERO_RESULTS", "results": [] }"#);
		assert!(matches!(
			first_result(response),
			Err(GeocodeError::AddressNotFound)
		));
	}

	#[test]
	fn denied_status_maps_to_provider_error() {
		let response = parse(
			r#"{ "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid." }"#,
		);
		let err = first_result(response).unwrap_err();
		match err {
			GeocodeError::Provider(message) => {
				assert!(message.contains("REQUEST_DENIED"));
				assert!(message.contains("invalid"));
			}
			other => panic!("expected provider error, got {:?}", other),
		}
	}

	#[test]
	fn reverse_components_extracted_by_type() {
		let response = parse(
			r#"{
				"status": "OK",
				"results": [
					{
						"geometry": { "location": { "lat": 19.4326, "lng": -99.1332 } },
						"address_components": [
							{ "long_name": "Avenida Juárez", "types": ["route"] },
							{ "long_name": "44", "types": ["street_number"] },
							{ "long_name": "Centro", "types": ["sublocality", "political"] },
							{ "long_name": "Cuauhtémoc", "types": ["administrative_area_level_2"] },
							{ "long_name": "Ciudad de México", "types": ["administrative_area_level_1"] },
							{ "long_name": "06000", "types": ["postal_code"] }
						]
					}
				]
			}"#,
		);
		let result = first_result(response).unwrap();
		let address = to_structured_address(&result);
		assert_eq!(address.street, "Avenida Juárez");
		assert_eq!(address.number, "44");
		assert_eq!(address.colony, "Centro");
		assert_eq!(address.municipality, "Cuauhtémoc");
		assert_eq!(address.state, "Ciudad de México");
		assert_eq!(address.postal_code, "06000");
	}

	#[test]
	fn missing_components_become_empty_strings() {
		let response = parse(
			r#"{
				"status": "OK",
				"results": [
					{
						"geometry": { "location": { "lat": 1.0, "lng": 2.0 } },
						"address_components": [
							{ "long_name": "Somewhere", "types": ["route"] }
						]
					}
				]
			}"#,
		);
		let result = first_result(response).unwrap();
		let address = to_structured_address(&result);
		assert_eq!(address.street, "Somewhere");
		assert_eq!(address.number, "");
		assert_eq!(address.postal_code, "");
	}

	#[test]
	fn factory_requires_api_key() {
		let config: toml::Value = toml::from_str("base_url = \"http://localhost\"").unwrap();
		assert!(matches!(
			create_geocoder(&config),
			Err(GeocodeError::Configuration(_))
		));

		let config: toml::Value = toml::from_str("api_key = \"test-key\"").unwrap();
		assert!(create_geocoder(&config).is_ok());
	}
}
