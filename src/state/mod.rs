//! In-process reconciliation state
//!
//! Nothing here is persisted; state lives for one process run.

mod model;

pub use model::AppliedState;
