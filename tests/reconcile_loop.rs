//! End-to-end behaviour of the reconcile cycle under the retry controller
//! and the poll driver, using scripted probes.

mod common;

use common::{RecordingActuator, ScriptedProber};
use std::time::Duration;
use sysmend::error::{MendError, EXIT_FAILED};
use sysmend::platform::{ConfigStore, FileStore, StoreValue};
use sysmend::probe::NetworkLocation::{Away, Home};
use sysmend::repair::{
    Action, DryRun, ReconcileMode, Reconciler, RegistryActuator, RetryPolicy, ValueMapping,
};
use sysmend::scheduler::{self, Cycle};
use sysmend::state::AppliedState;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn settle_waits_for_home_then_applies_once() {
    let prober = ScriptedProber::new(vec![Ok(Away), Ok(Away), Ok(Home)]);
    let mut reconciler = Reconciler::new(
        prober,
        RecordingActuator::new(),
        policy(5),
        ReconcileMode::Settle,
    );

    let applied = scheduler::run(&mut reconciler, None, std::future::pending())
        .await
        .unwrap();

    assert_eq!(reconciler.prober().calls, 3);
    assert_eq!(reconciler.actuator().applied, vec![Home]);
    assert_eq!(reconciler.actuator().remediations, 2);
    assert_eq!(applied.current(), Some(&Home));
}

#[tokio::test(start_paused = true)]
async fn unavailable_probe_exhausts_budget() {
    let prober = ScriptedProber::<sysmend::probe::TrustState>::new(vec![
        Err(MendError::ProbeUnavailable("no domain controller".into())),
        Err(MendError::ProbeUnavailable("no domain controller".into())),
        Err(MendError::ProbeUnavailable("no domain controller".into())),
        Err(MendError::ProbeUnavailable("no domain controller".into())),
    ]);
    let mut reconciler = Reconciler::new(
        prober,
        RecordingActuator::new(),
        policy(3),
        ReconcileMode::Settle,
    );

    let err = scheduler::run(&mut reconciler, None, std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, MendError::RetryExhausted { attempts: 3, .. }));
    assert_eq!(err.exit_code(), EXIT_FAILED);
    assert_eq!(reconciler.prober().calls, 3);
    assert!(reconciler.actuator().applied.is_empty());
}

#[tokio::test(start_paused = true)]
async fn remediation_is_verified_in_the_same_attempt() {
    use sysmend::probe::TrustState::{Broken, Healthy};

    let prober = ScriptedProber::new(vec![Ok(Broken), Ok(Healthy)]);
    let mut reconciler = Reconciler::new(
        prober,
        RecordingActuator::new().mutating(),
        policy(1),
        ReconcileMode::Settle,
    );
    let mut applied = AppliedState::new();

    let action = reconciler.cycle(&mut applied).await.unwrap();

    assert_eq!(action, Action::Apply(Healthy));
    assert_eq!(reconciler.prober().calls, 2);
    assert_eq!(reconciler.actuator().remediations, 1);
    assert_eq!(applied.current(), Some(&Healthy));
}

#[tokio::test(start_paused = true)]
async fn applied_state_follows_latest_change() {
    let prober = ScriptedProber::new(vec![Ok(Home), Ok(Home), Ok(Away), Ok(Away), Ok(Home)])
        .then_always(Home);
    let mut reconciler = Reconciler::new(
        prober,
        RecordingActuator::new(),
        policy(1),
        ReconcileMode::Track,
    );

    // cycles at 0, 10, 20, 30, 40
    let shutdown = tokio::time::sleep(Duration::from_secs(45));
    let applied = scheduler::run(&mut reconciler, Some(Duration::from_secs(10)), shutdown)
        .await
        .unwrap();

    assert_eq!(reconciler.prober().calls, 5);
    assert_eq!(reconciler.actuator().applied, vec![Home, Away, Home]);
    assert_eq!(applied.current(), Some(&Home));
    assert_eq!(applied.applications(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_probe_failure_does_not_touch_applied_state() {
    let prober = ScriptedProber::new(vec![
        Ok(Away),
        Err(MendError::ProbeUnavailable("adapter reset".into())),
        Ok(Away),
    ]);
    let mut reconciler = Reconciler::new(
        prober,
        RecordingActuator::new(),
        policy(2),
        ReconcileMode::Track,
    );
    let mut applied = AppliedState::new();

    assert_eq!(reconciler.cycle(&mut applied).await.unwrap(), Action::Apply(Away));
    assert_eq!(reconciler.cycle(&mut applied).await.unwrap(), Action::NoOp);
    assert_eq!(reconciler.prober().calls, 3);
    assert_eq!(reconciler.actuator().applied, vec![Away]);
}

#[tokio::test]
async fn registry_value_written_once_per_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let mapping = ValueMapping {
        key: "HKLM\\SOFTWARE\\Policies\\Example".into(),
        name: "Enabled".into(),
        home: StoreValue::Dword(1),
        away: StoreValue::Dword(0),
    };

    let prober = ScriptedProber::new(vec![Ok(Home), Ok(Home), Ok(Away)]);
    let actuator = RegistryActuator::new(FileStore::new(&path), mapping);
    let mut reconciler = Reconciler::new(prober, actuator, RetryPolicy::once(), ReconcileMode::Track);
    let mut applied = AppliedState::new();

    reconciler.cycle(&mut applied).await.unwrap();
    reconciler.cycle(&mut applied).await.unwrap();
    let store = FileStore::new(&path);
    assert_eq!(
        store.read("HKLM\\SOFTWARE\\Policies\\Example", "Enabled").await.unwrap(),
        Some(StoreValue::Dword(1))
    );

    reconciler.cycle(&mut applied).await.unwrap();
    assert_eq!(
        store.read("HKLM\\SOFTWARE\\Policies\\Example", "Enabled").await.unwrap(),
        Some(StoreValue::Dword(0))
    );
    assert_eq!(reconciler.actuator().writes(), 2);
}

#[tokio::test]
async fn restarted_process_does_not_rewrite_matching_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let mapping = ValueMapping {
        key: "HKCU\\Software\\sysmend".into(),
        name: "NetworkLocation".into(),
        home: StoreValue::String("Home".into()),
        away: StoreValue::String("Away".into()),
    };

    let mut writes = Vec::new();
    for _ in 0..2 {
        let prober = ScriptedProber::new(vec![Ok(Home)]);
        let actuator = RegistryActuator::new(FileStore::new(&path), mapping.clone());
        let mut reconciler =
            Reconciler::new(prober, actuator, RetryPolicy::once(), ReconcileMode::Track);
        let mut applied = AppliedState::new();

        // a fresh process always applies; the store read keeps it idempotent
        assert_eq!(reconciler.cycle(&mut applied).await.unwrap(), Action::Apply(Home));
        writes.push(reconciler.actuator().writes());
    }
    assert_eq!(writes, vec![1, 0]);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.matches("NetworkLocation").count(), 1);
}

#[tokio::test]
async fn dry_run_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let mapping = ValueMapping {
        key: "HKCU\\Software\\sysmend".into(),
        name: "NetworkLocation".into(),
        home: StoreValue::String("Home".into()),
        away: StoreValue::String("Away".into()),
    };

    let prober = ScriptedProber::new(vec![Ok(Away)]);
    let actuator = DryRun::new(RegistryActuator::new(FileStore::new(&path), mapping));
    let mut reconciler = Reconciler::new(prober, actuator, RetryPolicy::once(), ReconcileMode::Track);
    let mut applied = AppliedState::new();

    assert_eq!(reconciler.cycle(&mut applied).await.unwrap(), Action::Apply(Away));
    assert!(!path.exists());
}
