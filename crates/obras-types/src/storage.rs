//! Storage namespace definitions for persisted collections.

use std::str::FromStr;

/// Namespaces for the persisted document collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageNamespace {
	/// Customer orders.
	Orders,
	/// Per-recipient notification records.
	Notifications,
}

impl StorageNamespace {
	/// Returns the string representation of the namespace.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageNamespace::Orders => "orders",
			StorageNamespace::Notifications => "notifications",
		}
	}

	/// Returns an iterator over all namespace variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Orders, Self::Notifications].into_iter()
	}
}

impl FromStr for StorageNamespace {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"notifications" => Ok(Self::Notifications),
			_ => Err(()),
		}
	}
}

impl From<StorageNamespace> for &'static str {
	fn from(ns: StorageNamespace) -> Self {
		ns.as_str()
	}
}
