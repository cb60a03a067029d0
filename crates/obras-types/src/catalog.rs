//! Material catalog types.
//!
//! The catalog is small, static reference data loaded from configuration.
//! This core reads it to price line items; it never creates or mutates
//! entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LineItem;

/// Errors raised while pricing line items against the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
	/// A line item names a material the catalog does not carry.
	#[error("Unknown material: {0}")]
	UnknownMaterial(String),
}

/// A single material the retailer sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
	pub name: String,
	/// Price per unit of measure.
	pub unit_price: Decimal,
	/// Unit of measure (e.g. "bulto", "kg").
	pub unit: String,
}

/// Read-only material catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
	entries: Vec<CatalogEntry>,
}

impl Catalog {
	pub fn new(entries: Vec<CatalogEntry>) -> Self {
		Self { entries }
	}

	/// Looks up a catalog entry by material name.
	pub fn get(&self, material: &str) -> Option<&CatalogEntry> {
		self.entries.iter().find(|e| e.name == material)
	}

	/// All entries, in catalog order.
	pub fn entries(&self) -> &[CatalogEntry] {
		&self.entries
	}

	/// Computes the authoritative total for a set of line items.
	///
	/// Fails on the first material the catalog does not know; quantities
	/// are validated elsewhere.
	pub fn total_for(&self, items: &[LineItem]) -> Result<Decimal, CatalogError> {
		let mut total = Decimal::ZERO;
		for item in items {
			let entry = self
				.get(&item.material)
				.ok_or_else(|| CatalogError::UnknownMaterial(item.material.clone()))?;
			total += entry.unit_price * Decimal::from(item.quantity);
		}
		Ok(total)
	}
}
