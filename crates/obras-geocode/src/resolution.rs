//! Two-phase resolve→confirm protocol for delivery locations.
//!
//! Geocoding success alone never produces a delivery location: the
//! resolved point is shown to the user, may be dragged to a corrected
//! point, and becomes committable only after an explicit affirmative
//! acknowledgment. This module models that protocol as an explicit state
//! machine so "geocoded" and "committed" cannot be conflated.

use obras_types::GeoPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the location resolution protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
	/// Confirm or adjust was called before any point was proposed.
	#[error("No proposed location to act on")]
	NotProposed,
	/// The draft already carries a confirmed point; it can only change
	/// through an explicit new proposal by the user.
	#[error("Location already confirmed")]
	AlreadyConfirmed,
}

/// State of a delivery location during order capture.
///
/// `Unresolved → Proposed(point) → Confirmed(point)`; only a `Confirmed`
/// draft yields a point that may be written to an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LocationDraft {
	/// No geocoding attempt has produced a point yet.
	Unresolved,
	/// The geocoder (or a map drag) produced a candidate point awaiting
	/// user acknowledgment.
	Proposed(GeoPoint),
	/// The user explicitly acknowledged this point as correct.
	Confirmed(GeoPoint),
}

impl LocationDraft {
	/// A fresh draft with no candidate point.
	pub fn new() -> Self {
		LocationDraft::Unresolved
	}

	/// A draft already carrying a geocoder proposal.
	pub fn proposed(point: GeoPoint) -> Self {
		LocationDraft::Proposed(point)
	}

	/// Records a geocoder result as the candidate point.
	///
	/// Re-proposing over an unconfirmed candidate is allowed (the user
	/// edited the address text and geocoded again); proposing over a
	/// confirmed point is not.
	pub fn propose(&mut self, point: GeoPoint) -> Result<(), ResolutionError> {
		match self {
			LocationDraft::Confirmed(_) => Err(ResolutionError::AlreadyConfirmed),
			_ => {
				*self = LocationDraft::Proposed(point);
				Ok(())
			}
		}
	}

	/// Replaces the candidate point with a user-dragged correction.
	pub fn adjust(&mut self, point: GeoPoint) -> Result<(), ResolutionError> {
		match self {
			LocationDraft::Proposed(_) => {
				*self = LocationDraft::Proposed(point);
				Ok(())
			}
			LocationDraft::Confirmed(_) => Err(ResolutionError::AlreadyConfirmed),
			LocationDraft::Unresolved => Err(ResolutionError::NotProposed),
		}
	}

	/// Commits the candidate point on explicit user acknowledgment.
	pub fn confirm(&mut self) -> Result<GeoPoint, ResolutionError> {
		match *self {
			LocationDraft::Proposed(point) => {
				*self = LocationDraft::Confirmed(point);
				Ok(point)
			}
			LocationDraft::Confirmed(_) => Err(ResolutionError::AlreadyConfirmed),
			LocationDraft::Unresolved => Err(ResolutionError::NotProposed),
		}
	}

	/// The confirmed point, if the protocol completed.
	pub fn confirmed(&self) -> Option<GeoPoint> {
		match self {
			LocationDraft::Confirmed(point) => Some(*point),
			_ => None,
		}
	}
}

impl Default for LocationDraft {
	fn default() -> Self {
		Self::new()
	}
}
