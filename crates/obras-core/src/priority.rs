//! Priority classification for delivery windows.
//!
//! Maps the start of a delivery window to an urgency tier used for staff
//! triage. The rule depends only on the window start, never its end:
//! a delivery beginning within 3 days is `Urgent` (inclusive at exactly
//! 3 days), within 7 days `Soon`, and anything later `Normal`.

use chrono::{DateTime, Duration, Utc};
use obras_types::{DeliveryWindow, Priority};
use thiserror::Error;

/// Errors raised when a delivery window cannot be classified.
///
/// Priority drives staff triage, so an unclassifiable window is surfaced
/// to the caller instead of silently defaulting to some tier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriorityError {
	#[error("Delivery window cannot be classified: {0}")]
	Unclassifiable(String),
}

/// Classifies a window start against the current instant.
///
/// Pure and total: a start at or before `now` counts as starting
/// immediately and is `Urgent`. Callers wanting window validation use
/// [`classify_window`].
pub fn classify(from: DateTime<Utc>, now: DateTime<Utc>) -> Priority {
	let lead = from - now;
	if lead <= Duration::days(3) {
		Priority::Urgent
	} else if lead <= Duration::days(7) {
		Priority::Soon
	} else {
		Priority::Normal
	}
}

/// Validates a delivery window and classifies it.
///
/// Rejects inverted windows and windows that start before the calendar
/// day of `now`; a start earlier today is still classifiable (the
/// delivery begins immediately).
pub fn classify_window(
	window: &DeliveryWindow,
	now: DateTime<Utc>,
) -> Result<Priority, PriorityError> {
	if window.from > window.to {
		return Err(PriorityError::Unclassifiable(format!(
			"window start {} is after its end {}",
			window.from, window.to
		)));
	}

	let today = now.date_naive();
	if window.from.date_naive() < today {
		return Err(PriorityError::Unclassifiable(format!(
			"window starts in the past ({})",
			window.from.date_naive()
		)));
	}

	Ok(classify(window.from, now))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
	}

	#[test]
	fn starting_today_is_urgent() {
		assert_eq!(classify(now(), now()), Priority::Urgent);
	}

	#[test]
	fn exactly_three_days_is_urgent() {
		let from = now() + Duration::days(3);
		assert_eq!(classify(from, now()), Priority::Urgent);
	}

	#[test]
	fn one_second_past_three_days_is_soon() {
		let from = now() + Duration::days(3) + Duration::seconds(1);
		assert_eq!(classify(from, now()), Priority::Soon);
	}

	#[test]
	fn exactly_seven_days_is_soon() {
		let from = now() + Duration::days(7);
		assert_eq!(classify(from, now()), Priority::Soon);
	}

	#[test]
	fn one_second_past_seven_days_is_normal() {
		let from = now() + Duration::days(7) + Duration::seconds(1);
		assert_eq!(classify(from, now()), Priority::Normal);
	}

	#[test]
	fn inverted_window_is_unclassifiable() {
		let window = DeliveryWindow {
			from: now() + Duration::days(4),
			to: now() + Duration::days(1),
		};
		assert!(classify_window(&window, now()).is_err());
	}

	#[test]
	fn window_starting_yesterday_is_unclassifiable() {
		let window = DeliveryWindow {
			from: now() - Duration::days(1),
			to: now() + Duration::days(1),
		};
		assert!(classify_window(&window, now()).is_err());
	}

	#[test]
	fn window_starting_earlier_today_still_classifies() {
		let window = DeliveryWindow {
			from: now() - Duration::hours(2),
			to: now() + Duration::days(1),
		};
		assert_eq!(classify_window(&window, now()).unwrap(), Priority::Urgent);
	}
}
