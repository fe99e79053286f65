//! Service layer for business logic operations.
//!
//! Services coordinate between the store, the scheduling engine and the
//! handlers.

pub mod lifecycle;
pub mod notifications;

pub use lifecycle::{LifecycleCoordinator, NewJobRequest};
pub use notifications::{NotificationService, NotificationSink};
