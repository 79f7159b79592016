//! Reconciliation decisions and the probe → reconcile → apply cycle

use super::actions::Actuator;
use super::retry::{with_retry, Attempt, RetryPolicy};
use crate::error::{MendError, MendResult};
use crate::probe::{Observation, Prober};
use crate::scheduler::Cycle;
use crate::state::AppliedState;
use tracing::{debug, info};

/// What to do about an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<S> {
    /// Applied state already matches
    NoOp,
    /// Bring applied state in line with this observation
    Apply(S),
}

/// Decide the action for `current` given what was last applied
pub fn reconcile<S: Clone + PartialEq>(current: &S, previous: &AppliedState<S>) -> Action<S> {
    match previous.current() {
        Some(applied) if applied == current => Action::NoOp,
        _ => Action::Apply(current.clone()),
    }
}

/// Perform `action` and move applied state forward on success
///
/// A dry-run actuator records the planned state without touching anything.
pub async fn execute<S, A>(
    action: Action<S>,
    actuator: &mut A,
    applied: &mut AppliedState<S>,
) -> MendResult<Action<S>>
where
    S: Observation,
    A: Actuator<S>,
{
    if let Action::Apply(ref state) = action {
        actuator.apply(state).await?;
        applied.record(state.clone());
        if actuator.is_dry_run() {
            info!("Would apply {}", state);
        } else {
            info!("Applied {}", state);
        }
    }
    Ok(action)
}

/// How a cycle treats unsettled observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Apply whatever is observed
    Track,
    /// Remediate until the observation settles, then apply it
    Settle,
}

/// Prober and actuator paired under a retry policy
pub struct Reconciler<P, A> {
    prober: P,
    actuator: A,
    policy: RetryPolicy,
    mode: ReconcileMode,
}

impl<P, A> Reconciler<P, A>
where
    P: Prober,
    A: Actuator<P::Output>,
{
    pub fn new(prober: P, actuator: A, policy: RetryPolicy, mode: ReconcileMode) -> Self {
        Self {
            prober,
            actuator,
            policy,
            mode,
        }
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}

impl<P, A> Cycle for Reconciler<P, A>
where
    P: Prober,
    A: Actuator<P::Output>,
{
    type State = P::Output;

    async fn cycle(
        &mut self,
        applied: &mut AppliedState<P::Output>,
    ) -> MendResult<Action<P::Output>> {
        let mut attempt = ReconcileAttempt {
            prober: &mut self.prober,
            actuator: &mut self.actuator,
            applied,
            mode: self.mode,
        };
        with_retry(&mut attempt, self.policy).await
    }
}

/// One attempt of a cycle, borrowing the reconciler's parts
struct ReconcileAttempt<'a, P: Prober, A> {
    prober: &'a mut P,
    actuator: &'a mut A,
    applied: &'a mut AppliedState<P::Output>,
    mode: ReconcileMode,
}

impl<P, A> Attempt for ReconcileAttempt<'_, P, A>
where
    P: Prober,
    A: Actuator<P::Output>,
{
    type Output = Action<P::Output>;

    async fn attempt(&mut self) -> MendResult<Action<P::Output>> {
        let mut current = self.prober.probe().await?;
        debug!("Observed {}", current);

        if self.mode == ReconcileMode::Settle && !current.is_settled() {
            if !self.actuator.remediate(&current).await? {
                return Err(MendError::NotSettled {
                    observed: current.to_string(),
                });
            }
            current = self.prober.probe().await?;
            debug!("Observed {} after remediation", current);
            if !current.is_settled() {
                return Err(MendError::NotSettled {
                    observed: current.to_string(),
                });
            }
        }

        let action = reconcile(&current, &*self.applied);
        execute(action, &mut *self.actuator, &mut *self.applied).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::NetworkLocation;

    #[test]
    fn test_first_invocation_applies() {
        let applied = AppliedState::new();
        assert_eq!(
            reconcile(&NetworkLocation::Away, &applied),
            Action::Apply(NetworkLocation::Away)
        );
    }

    #[test]
    fn test_unchanged_is_noop() {
        let mut applied = AppliedState::new();
        applied.record(NetworkLocation::Home);
        assert_eq!(reconcile(&NetworkLocation::Home, &applied), Action::NoOp);
    }

    #[tokio::test]
    async fn test_dry_run_tracks_planned_state_only() {
        use crate::platform::{FileStore, StoreValue};
        use crate::repair::{DryRun, RegistryActuator, ValueMapping};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mapping = ValueMapping {
            key: "HKCU\\Software\\sysmend".into(),
            name: "NetworkLocation".into(),
            home: StoreValue::String("Home".into()),
            away: StoreValue::String("Away".into()),
        };
        let mut actuator = DryRun::new(RegistryActuator::new(FileStore::new(&path), mapping));
        let mut applied = AppliedState::new();

        let action = reconcile(&NetworkLocation::Away, &applied);
        let done = execute(action, &mut actuator, &mut applied).await.unwrap();

        assert!(Actuator::<NetworkLocation>::is_dry_run(&actuator));
        assert_eq!(done, Action::Apply(NetworkLocation::Away));
        assert_eq!(applied.current(), Some(&NetworkLocation::Away));
        assert!(!path.exists());
        assert_eq!(actuator.into_inner().writes(), 0);
    }

    #[test]
    fn test_change_applies_new_value() {
        let mut applied = AppliedState::new();
        applied.record(NetworkLocation::Home);
        assert_eq!(
            reconcile(&NetworkLocation::Away, &applied),
            Action::Apply(NetworkLocation::Away)
        );
    }
}
