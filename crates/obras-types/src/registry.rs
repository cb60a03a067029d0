//! Registry trait for self-registering implementations.
//!
//! Each backend module (storage, geocoding) provides a Registry struct
//! implementing this trait, declaring its configuration name and the
//! factory function that builds it from TOML configuration.

/// Base trait for implementation registries.
///
/// Every pluggable implementation declares the name used to reference it
/// in configuration files, for example:
/// - "memory" for storage.implementations.memory
/// - "google" for geocoding.implementations.google
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this
	/// implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	///
	/// Each module defines its own factory type, for example
	/// StorageFactory for storage backends or GeocoderFactory for
	/// geocoding providers.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
