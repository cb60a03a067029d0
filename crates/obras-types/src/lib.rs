//! Common types module for the obras order-management backend.
//!
//! This module defines the core data types and structures shared by all
//! components of the system. It provides a centralized location for the
//! domain model so that storage, geocoding, notification, and lifecycle
//! crates agree on a single representation.

/// Material catalog types: names, unit prices, units of measure.
pub mod catalog;
/// Event types for inter-component communication.
pub mod events;
/// Geographic types for delivery locations.
pub mod geo;
/// Notification records delivered to customers and staff.
pub mod notification;
/// Order types: drafts, line items, delivery windows, statuses.
pub mod order;
/// Registry trait for self-registering backend implementations.
pub mod registry;
/// Storage namespace definitions for persisted collections.
pub mod storage;
/// Configuration validation types for backend implementations.
pub mod validation;

// Re-export all types for convenient access
pub use catalog::*;
pub use events::*;
pub use geo::*;
pub use notification::*;
pub use order::*;
pub use registry::*;
pub use storage::*;
pub use validation::*;
