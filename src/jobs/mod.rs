//! Scheduling and execution engine.
//!
//! `trigger` turns a schedule into fire times, `registry` owns the live
//! trigger handles, `ledger` keeps the per-job event records and `executor`
//! performs a firing.

pub mod clock;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod probe;
pub mod registry;
pub mod retry;
pub mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{JobError, JobResult};
pub use executor::Executor;
pub use ledger::EventLedger;
pub use probe::{HttpProbe, Probe, ProbeFailure};
pub use registry::{FireContext, FireHandler, HandleInfo, HandleState, ScheduleRegistry, TriggerConfig};
pub use retry::{AttemptState, Backoff, DispatchOutcome, RetryPolicy};
pub use trigger::{ScheduleDescriptor, next_fire_times};
