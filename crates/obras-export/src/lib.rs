//! Delivery document export for the obras order-management backend.
//!
//! Defines the data contract for the human-readable delivery confirmation
//! document and a plain-text renderer. The visual design of the exported
//! artifact belongs to the external export collaborator; this crate fixes
//! only which fields appear. Rendering reads from the stored order and
//! never mutates it, so a document can be regenerated any number of times.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use obras_types::Order;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during document export.
#[derive(Debug, Error)]
pub enum ExportError {
	/// The order has no delivery confirmation to document.
	#[error("Order has no delivery confirmation")]
	MissingConfirmation,
	/// Failure in the rendering backend.
	#[error("Render error: {0}")]
	Render(String),
}

/// One priced line in the delivery document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
	pub material: String,
	pub quantity: u32,
}

/// The data contract for a delivery confirmation document.
///
/// Everything the export collaborator is given: order identity, requester
/// identity, site, the delivery timestamp, the signature artifact, and an
/// optional map thumbnail reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDocument {
	pub order_id: String,
	pub requester_name: String,
	pub project_name: String,
	pub items: Vec<DocumentLine>,
	pub total: Decimal,
	pub delivered_at: DateTime<Utc>,
	/// Reference to the captured signature artifact.
	pub signature: String,
	/// Reference to a static map image of the delivery point, when the
	/// order carries a confirmed location.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub map_thumbnail: Option<String>,
}

impl DeliveryDocument {
	/// Builds the document contract from a delivered order.
	///
	/// Requires the order to carry its delivery confirmation; everything
	/// else is read as-is from the stored record.
	pub fn from_order(order: &Order) -> Result<Self, ExportError> {
		let confirmation = order
			.confirmation
			.as_ref()
			.ok_or(ExportError::MissingConfirmation)?;

		Ok(Self {
			order_id: order.id.clone(),
			requester_name: order.requester_name.clone(),
			project_name: order.project_name.clone(),
			items: order
				.items
				.iter()
				.map(|item| DocumentLine {
					material: item.material.clone(),
					quantity: item.quantity,
				})
				.collect(),
			total: order.total,
			delivered_at: confirmation.confirmed_at,
			signature: confirmation.signature.clone(),
			map_thumbnail: order.location.map(|point| format!("map:{}", point)),
		})
	}
}

/// A rendered export artifact ready for download.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

/// Trait defining the interface for document renderers.
///
/// The external export capability implements this; the core only supplies
/// the [`DeliveryDocument`] contract.
#[async_trait]
pub trait DocumentExportInterface: Send + Sync {
	/// Renders the delivery document into a downloadable artifact.
	async fn render(&self, document: &DeliveryDocument) -> Result<ExportArtifact, ExportError>;
}

/// Plain-text renderer, the reference implementation of the contract.
pub struct TextRenderer;

#[async_trait]
impl DocumentExportInterface for TextRenderer {
	async fn render(&self, document: &DeliveryDocument) -> Result<ExportArtifact, ExportError> {
		let mut body = String::new();
		body.push_str("DELIVERY CONFIRMATION\n");
		body.push_str("=====================\n\n");
		body.push_str(&format!("Order:      {}\n", document.order_id));
		body.push_str(&format!("Requester:  {}\n", document.requester_name));
		body.push_str(&format!("Project:    {}\n", document.project_name));
		body.push_str(&format!(
			"Delivered:  {}\n\n",
			document.delivered_at.to_rfc3339()
		));
		for line in &document.items {
			body.push_str(&format!("  {} x {}\n", line.quantity, line.material));
		}
		body.push_str(&format!("\nTotal: ${}\n", document.total));
		body.push_str(&format!("Signed: {}\n", document.signature));
		if let Some(thumbnail) = &document.map_thumbnail {
			body.push_str(&format!("Map: {}\n", thumbnail));
		}

		Ok(ExportArtifact {
			file_name: format!("delivery-{}.txt", document.order_id),
			content_type: "text/plain; charset=utf-8".to_string(),
			bytes: body.into_bytes(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use obras_types::{
		DeliveryAddress, DeliveryConfirmation, DeliveryWindow, GeoPoint, LineItem, OrderStatus,
		Priority,
	};

	fn delivered_order() -> Order {
		let now = Utc::now();
		Order {
			id: "order-9".into(),
			user_id: "customer-1".into(),
			requester_name: "Juan Pérez".into(),
			project_name: "Torre Reforma".into(),
			phone: "5512345678".into(),
			address: DeliveryAddress::default(),
			location: Some(GeoPoint {
				lat: 19.4326,
				lng: -99.1332,
			}),
			items: vec![LineItem {
				material: "cemento".into(),
				quantity: 10,
			}],
			total: Decimal::from(2500),
			window: DeliveryWindow {
				from: now,
				to: now + Duration::days(2),
			},
			priority: Priority::Urgent,
			status: OrderStatus::Delivered,
			confirmation: Some(DeliveryConfirmation {
				signature: "sig:abc123".into(),
				confirmed_at: now,
			}),
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn document_requires_a_confirmation() {
		let mut order = delivered_order();
		order.confirmation = None;
		assert!(matches!(
			DeliveryDocument::from_order(&order),
			Err(ExportError::MissingConfirmation)
		));
	}

	#[tokio::test]
	async fn rendered_document_carries_the_contract_fields() {
		let order = delivered_order();
		let document = DeliveryDocument::from_order(&order).unwrap();
		let artifact = TextRenderer.render(&document).await.unwrap();

		let body = String::from_utf8(artifact.bytes).unwrap();
		assert!(body.contains("order-9"));
		assert!(body.contains("Juan Pérez"));
		assert!(body.contains("Torre Reforma"));
		assert!(body.contains("10 x cemento"));
		assert!(body.contains("sig:abc123"));
		assert_eq!(artifact.file_name, "delivery-order-9.txt");
	}

	#[tokio::test]
	async fn rendering_is_repeatable_and_pure() {
		let order = delivered_order();
		let document = DeliveryDocument::from_order(&order).unwrap();

		let first = TextRenderer.render(&document).await.unwrap();
		let second = TextRenderer.render(&document).await.unwrap();
		assert_eq!(first.bytes, second.bytes);
	}
}
