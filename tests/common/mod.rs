//! Scripted probers and actuators shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use sysmend::error::{MendError, MendResult};
use sysmend::probe::{Observation, Prober};
use sysmend::repair::{Actuator, RepairAction};

/// Replays a fixed sequence of probe results, then repeats the fallback
pub struct ScriptedProber<S> {
    script: VecDeque<MendResult<S>>,
    fallback: Option<S>,
    pub calls: u32,
}

impl<S> ScriptedProber<S> {
    pub fn new(script: Vec<MendResult<S>>) -> Self {
        Self {
            script: script.into(),
            fallback: None,
            calls: 0,
        }
    }

    pub fn then_always(mut self, state: S) -> Self {
        self.fallback = Some(state);
        self
    }
}

impl<S: Observation> Prober for ScriptedProber<S> {
    type Output = S;

    async fn probe(&mut self) -> MendResult<S> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| MendError::ProbeUnavailable("script exhausted".into())),
        }
    }
}

/// Records every apply and remediation
pub struct RecordingActuator<S> {
    pub applied: Vec<S>,
    pub remediations: u32,
    remediation_error: Option<fn() -> MendError>,
    remediation_mutates: bool,
}

impl<S> RecordingActuator<S> {
    pub fn new() -> Self {
        Self {
            applied: Vec::new(),
            remediations: 0,
            remediation_error: None,
            remediation_mutates: false,
        }
    }

    /// Remediation reports a mutation, so the state is probed again
    pub fn mutating(mut self) -> Self {
        self.remediation_mutates = true;
        self
    }

    /// Remediation fails with this error
    pub fn failing_with(mut self, error: fn() -> MendError) -> Self {
        self.remediation_error = Some(error);
        self
    }
}

impl<S: Observation> Actuator<S> for RecordingActuator<S> {
    async fn apply(&mut self, state: &S) -> MendResult<()> {
        self.applied.push(state.clone());
        Ok(())
    }

    async fn remediate(&mut self, _observed: &S) -> MendResult<bool> {
        self.remediations += 1;
        match self.remediation_error {
            Some(make) => Err(make()),
            None => Ok(self.remediation_mutates),
        }
    }

    fn plan_apply(&self, _state: &S) -> RepairAction {
        RepairAction::RecordHealthy
    }
}
