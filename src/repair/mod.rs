//! Detect-and-repair machinery
//!
//! Reconciliation decisions, the actuators that carry them out, and the
//! bounded retry controller wrapped around each cycle.

pub mod actions;
pub mod reconcile;
pub mod retry;

pub use actions::{Actuator, ChannelRepair, DryRun, RegistryActuator, RepairAction, ValueMapping};
pub use reconcile::{reconcile, Action, ReconcileMode, Reconciler};
pub use retry::{with_retry, Attempt, RetryBudget, RetryController, RetryPhase, RetryPolicy};
