//! Configuration module for the obras order-management backend.
//!
//! Provides structures and utilities for managing service configuration.
//! Configuration is loaded from TOML files; `${VAR}` and `${VAR:-default}`
//! references are resolved from the environment before parsing, so secrets
//! such as the geocoding API key never live in the file itself.

use obras_types::{Catalog, CatalogEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the obras backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the geocoding provider.
	pub geocoding: GeocodingConfig,
	/// Configuration for notification dispatch.
	pub notifications: NotificationsConfig,
	/// The material catalog.
	pub catalog: CatalogConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in log output.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the geocoding provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodingConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of geocoder implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for notification dispatch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
	/// User ids of staff/administrators notified of every new order.
	pub staff_recipients: Vec<String>,
}

/// One material in the configured catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaterialConfig {
	pub name: String,
	pub unit_price: Decimal,
	pub unit: String,
}

/// The material catalog as configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
	pub materials: Vec<MaterialConfig>,
}

impl CatalogConfig {
	/// Builds the runtime catalog from the configured materials.
	pub fn to_catalog(&self) -> Catalog {
		Catalog::new(
			self.materials
				.iter()
				.map(|m| CatalogEntry {
					name: m.name.clone(),
					unit_price: m.unit_price,
					unit: m.unit.clone(),
				})
				.collect(),
		)
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable
/// VAR_NAME. Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).expect("capture 0 always present");
		let var_name = cap.get(1).expect("group 1 always present").as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			}
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		// Validate storage config
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		// Validate geocoding config
		if self.geocoding.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one geocoding implementation must be configured".into(),
			));
		}
		if !self
			.geocoding
			.implementations
			.contains_key(&self.geocoding.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary geocoder '{}' not found in implementations",
				self.geocoding.primary
			)));
		}

		// Validate notifications config
		if self.notifications.staff_recipients.is_empty() {
			return Err(ConfigError::Validation(
				"At least one staff recipient must be configured".into(),
			));
		}

		// Validate catalog config
		if self.catalog.materials.is_empty() {
			return Err(ConfigError::Validation(
				"Catalog must contain at least one material".into(),
			));
		}
		for material in &self.catalog.materials {
			if material.unit_price <= Decimal::ZERO {
				return Err(ConfigError::Validation(format!(
					"Material '{}' must have a positive unit price",
					material.name
				)));
			}
		}

		Ok(())
	}
}

/// Implementation of FromStr for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is
/// automatically validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[service]
id = "obras-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[geocoding]
primary = "google"
[geocoding.implementations.google]
api_key = "${OBRAS_MAPS_KEY:-test-key}"

[notifications]
staff_recipients = ["admin-1", "admin-2"]

[[catalog.materials]]
name = "cemento"
unit_price = 250.00
unit = "bulto"

[[catalog.materials]]
name = "alambre"
unit_price = 15.00
unit = "kg"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("OBRAS_TEST_HOST", "localhost");
		std::env::set_var("OBRAS_TEST_PORT", "5432");

		let input = "host = \"${OBRAS_TEST_HOST}:${OBRAS_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("OBRAS_TEST_HOST");
		std::env::remove_var("OBRAS_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${OBRAS_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${OBRAS_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("OBRAS_MISSING_VAR"));
	}

	#[test]
	fn test_full_config_parses_and_validates() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.service.id, "obras-test");
		assert_eq!(config.storage.primary, "memory");
		assert_eq!(config.notifications.staff_recipients.len(), 2);

		let catalog = config.catalog.to_catalog();
		assert_eq!(
			catalog.get("cemento").unwrap().unit_price,
			"250.00".parse::<Decimal>().unwrap()
		);
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"postgres\"");
		let result = config_str.parse::<Config>();
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("Primary storage 'postgres' not found"));
	}

	#[test]
	fn test_empty_staff_recipients_rejected() {
		let config_str = BASE_CONFIG.replace(
			"staff_recipients = [\"admin-1\", \"admin-2\"]",
			"staff_recipients = []",
		);
		let result = config_str.parse::<Config>();
		assert!(result.is_err());
	}

	#[test]
	fn test_non_positive_price_rejected() {
		let config_str = BASE_CONFIG.replace("unit_price = 15.00", "unit_price = 0.00");
		let result = config_str.parse::<Config>();
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("alambre"));
	}
}
