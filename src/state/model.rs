//! Applied state model

use std::time::SystemTime;

/// The last successfully applied reconciliation
///
/// Owned by the poll driver and lent to each cycle. Only
/// [`AppliedState::record`] moves it forward, and callers invoke that
/// after the corrective action returned success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedState<S> {
    /// Value of the last successful application
    last: Option<S>,
    /// When it was applied
    applied_at: Option<SystemTime>,
    /// Successful applications during this run
    applications: u64,
}

impl<S> AppliedState<S> {
    /// Empty state, nothing applied yet
    pub fn new() -> Self {
        Self {
            last: None,
            applied_at: None,
            applications: 0,
        }
    }

    /// Last applied value, if any
    pub fn current(&self) -> Option<&S> {
        self.last.as_ref()
    }

    /// Record a successful application
    pub fn record(&mut self, value: S) {
        self.last = Some(value);
        self.applied_at = Some(SystemTime::now());
        self.applications += 1;
    }

    /// Number of successful applications so far
    pub fn applications(&self) -> u64 {
        self.applications
    }

    /// Seconds since the last application
    pub fn since_last_apply(&self) -> Option<u64> {
        self.applied_at
            .and_then(|t| t.elapsed().ok().map(|d| d.as_secs()))
    }
}

impl<S> Default for AppliedState<S> {
    fn default() -> Self {
        Self::new()
    }
}
