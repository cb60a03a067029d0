//! Notification dispatch module for the obras order-management backend.
//!
//! Creates per-recipient notification records when an order is created,
//! changes status, or is removed. Dispatch is deliberately best-effort:
//! the order write is the primary artifact of record, so a failed
//! notification write is logged and reported but never rolls back the
//! operation that triggered it. Retried dispatches may duplicate a
//! notification; at-least-once wins over exactly-once here.

use async_trait::async_trait;
use chrono::Utc;
use obras_storage::StorageService;
use obras_types::{Notification, Order, OrderStatus, StorageNamespace};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during notification dispatch.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// Failure reading or writing notification records.
	#[error("Storage error: {0}")]
	Storage(String),
	/// Failure enumerating recipients.
	#[error("Directory error: {0}")]
	Directory(String),
}

/// Source of staff/administrator recipient ids for creation fan-out.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
	/// All staff recipients that should hear about new orders.
	async fn staff_recipients(&self) -> Result<Vec<String>, NotifyError>;
}

/// Directory backed by a fixed list from configuration.
pub struct StaticDirectory {
	recipients: Vec<String>,
}

impl StaticDirectory {
	pub fn new(recipients: Vec<String>) -> Self {
		Self { recipients }
	}
}

#[async_trait]
impl RecipientDirectory for StaticDirectory {
	async fn staff_recipients(&self) -> Result<Vec<String>, NotifyError> {
		Ok(self.recipients.clone())
	}
}

/// Outcome of a creation fan-out.
///
/// Partial failure is expected and non-fatal; the caller decides what to
/// surface for observability.
#[derive(Debug, Default)]
pub struct DispatchReport {
	/// Notifications that were written.
	pub delivered: Vec<Notification>,
	/// Recipients whose write failed, with the failure text.
	pub failed: Vec<(String, String)>,
}

/// Service that creates and maintains notification records.
pub struct NotificationDispatcher {
	storage: Arc<StorageService>,
	directory: Box<dyn RecipientDirectory>,
}

impl NotificationDispatcher {
	pub fn new(storage: Arc<StorageService>, directory: Box<dyn RecipientDirectory>) -> Self {
		Self { storage, directory }
	}

	fn build(&self, recipient_id: &str, order_id: &str, message: String) -> Notification {
		Notification {
			id: Uuid::new_v4().to_string(),
			recipient_id: recipient_id.to_string(),
			order_id: order_id.to_string(),
			message,
			read: false,
			created_at: Utc::now(),
		}
	}

	async fn write(&self, notification: &Notification) -> Result<(), NotifyError> {
		self.storage
			.store(
				StorageNamespace::Notifications.as_str(),
				&notification.id,
				notification,
			)
			.await
			.map_err(|e| NotifyError::Storage(e.to_string()))
	}

	/// Fans out one notification per staff recipient for a new order.
	///
	/// A failed write for one recipient is logged and recorded in the
	/// report; it does not abort the remaining recipients and it must not
	/// fail the already-committed order creation.
	pub async fn notify_creation(&self, order: &Order) -> Result<DispatchReport, NotifyError> {
		let recipients = self.directory.staff_recipients().await?;
		let message = format!(
			"New order from {} for project {}",
			order.requester_name, order.project_name
		);

		let mut report = DispatchReport::default();
		for recipient_id in recipients {
			let notification = self.build(&recipient_id, &order.id, message.clone());
			match self.write(&notification).await {
				Ok(()) => report.delivered.push(notification),
				Err(e) => {
					tracing::warn!(
						recipient_id = %recipient_id,
						order_id = %order.id,
						error = %e,
						"Failed to dispatch creation notification"
					);
					report.failed.push((recipient_id, e.to_string()));
				}
			}
		}
		Ok(report)
	}

	/// Creates exactly one notification for the order owner describing a
	/// status change.
	pub async fn notify_status_change(
		&self,
		order: &Order,
		new_status: OrderStatus,
	) -> Result<Notification, NotifyError> {
		let message = format!(
			"Your order for {} is now {}",
			order.project_name, new_status
		);
		let notification = self.build(&order.user_id, &order.id, message);
		self.write(&notification).await?;
		Ok(notification)
	}

	/// Notifies the owner that an administrator removed their order.
	pub async fn notify_deleted(&self, order: &Order) -> Result<Notification, NotifyError> {
		let message = format!(
			"Your order for {} was cancelled and removed by an administrator",
			order.project_name
		);
		let notification = self.build(&order.user_id, &order.id, message);
		self.write(&notification).await?;
		Ok(notification)
	}

	/// All notifications for a recipient, most recent first.
	pub async fn notifications_for(
		&self,
		recipient_id: &str,
	) -> Result<Vec<Notification>, NotifyError> {
		let mut notifications: Vec<Notification> = self
			.storage
			.retrieve_all(StorageNamespace::Notifications.as_str())
			.await
			.map_err(|e| NotifyError::Storage(e.to_string()))?
			.into_iter()
			.filter(|n: &Notification| n.recipient_id == recipient_id)
			.collect();
		notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(notifications)
	}

	/// Marks every unread notification for a recipient as read, as one
	/// batch write.
	///
	/// Returns the number of notifications flipped.
	pub async fn mark_all_read(&self, recipient_id: &str) -> Result<usize, NotifyError> {
		let unread_ids: Vec<String> = self
			.notifications_for(recipient_id)
			.await?
			.into_iter()
			.filter(|n| !n.read)
			.map(|n| n.id)
			.collect();

		if unread_ids.is_empty() {
			return Ok(0);
		}

		self.storage
			.update_batch::<Notification, _>(
				StorageNamespace::Notifications.as_str(),
				&unread_ids,
				|n| n.read = true,
			)
			.await
			.map_err(|e| NotifyError::Storage(e.to_string()))?;
		Ok(unread_ids.len())
	}
}
