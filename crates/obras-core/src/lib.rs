//! Core orchestration for the obras order-management backend.
//!
//! This crate ties the leaf services together: priority classification,
//! the order status state machine, the order lifecycle with its
//! notification side effects, the delivery confirmation service, and the
//! builder that assembles a running system from configuration and
//! pluggable backend factories.

pub mod builder;
pub mod confirmation;
pub mod engine;
pub mod event_bus;
pub mod lifecycle;
pub mod priority;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::{BuilderError, ObrasBuilder, ObrasFactories};
pub use confirmation::{ConfirmationError, DeliveryConfirmationService};
pub use engine::ObrasEngine;
pub use event_bus::EventBus;
pub use lifecycle::{DeleteOutcome, LifecycleError, OrderLifecycle};
pub use priority::{classify, classify_window, PriorityError};
pub use state::{OrderStateError, OrderStateMachine};
